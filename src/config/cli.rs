use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

use crate::application::view::SortKey;
use crate::domain::types::BadgeTier;

/// Command-line arguments for the Fiidbak binary.
#[derive(Debug, Parser)]
#[command(
    name = "fiidbak",
    version,
    about = "Browse and contribute to the Fiidbak product-feedback ledger"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "FIIDBAK_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the ledger gateway base URL.
    #[arg(long = "ledger-url", value_name = "URL", global = true)]
    pub ledger_url: Option<String>,

    /// Override the content gateway base URL.
    #[arg(long = "gateway-url", value_name = "URL", global = true)]
    pub gateway_url: Option<String>,

    /// Override the products snapshot file.
    #[arg(long = "cache-file", value_name = "PATH", value_hint = ValueHint::FilePath, global = true)]
    pub cache_file: Option<PathBuf>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// List products.
    Products(ViewArgs),
    /// List feedback for one product.
    Feedback(FeedbackArgs),
    /// Show the badge tier of an address.
    Tier(TierArgs),
    /// Show the current tier and the badges an address can claim.
    Badges(TierArgs),
    /// Claim an earned badge tier.
    #[command(name = "claim-badge")]
    ClaimBadge(ClaimBadgeArgs),
    /// Upload product details and register the product on the ledger.
    #[command(name = "create-product")]
    CreateProduct(CreateProductArgs),
    /// Upload feedback text and register it for a product.
    #[command(name = "submit-feedback")]
    SubmitFeedback(SubmitFeedbackArgs),
    /// Vote on a feedback item.
    Vote(VoteArgs),
}

#[derive(Debug, Args, Clone)]
pub struct ViewArgs {
    /// Case-insensitive filter on name and description.
    #[arg(long, value_name = "TEXT", default_value = "")]
    pub search: String,

    /// Only show products owned, or feedback written, by this address.
    #[arg(long, value_name = "ADDRESS")]
    pub by: Option<String>,

    /// Sort order: newest, oldest or most-reviewed.
    #[arg(long, value_name = "KEY", default_value = "newest")]
    pub sort: SortKey,

    /// 1-based page number.
    #[arg(long, value_name = "N", default_value_t = 1)]
    pub page: usize,

    /// Items per page; defaults to `display.page_size`.
    #[arg(long = "page-size", value_name = "N")]
    pub page_size: Option<usize>,

    /// Refetch even when the cached collection is fresh.
    #[arg(long)]
    pub refresh: bool,

    /// Print JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args, Clone)]
pub struct FeedbackArgs {
    #[arg(value_name = "PRODUCT_ID")]
    pub product_id: u64,

    #[command(flatten)]
    pub view: ViewArgs,
}

#[derive(Debug, Args, Clone)]
pub struct TierArgs {
    #[arg(value_name = "ADDRESS")]
    pub address: String,
}

#[derive(Debug, Args, Clone)]
pub struct CreateProductArgs {
    /// Address registering the product.
    #[arg(long, value_name = "ADDRESS")]
    pub owner: String,

    #[arg(long, value_name = "TEXT")]
    pub name: String,

    #[arg(long, value_name = "TEXT")]
    pub description: String,

    /// Image URL stored as-is.
    #[arg(long, value_name = "URL", conflicts_with = "image_file")]
    pub image: Option<String>,

    /// Local image uploaded to the content store.
    #[arg(long = "image-file", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub image_file: Option<PathBuf>,

    #[arg(long, value_name = "TEXT")]
    pub category: Option<String>,

    #[arg(long, value_name = "URL")]
    pub website: Option<String>,

    /// Tag to attach; repeatable.
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,
}

#[derive(Debug, Args, Clone)]
pub struct SubmitFeedbackArgs {
    #[arg(long, value_name = "ADDRESS")]
    pub author: String,

    #[arg(value_name = "PRODUCT_ID")]
    pub product_id: u64,

    #[arg(value_name = "TEXT")]
    pub text: String,
}

#[derive(Debug, Args, Clone)]
pub struct VoteArgs {
    #[arg(long, value_name = "ADDRESS")]
    pub voter: String,

    #[arg(value_name = "PRODUCT_ID")]
    pub product_id: u64,

    #[arg(value_name = "FEEDBACK_ID")]
    pub feedback_id: u64,

    /// Cast a downvote instead of an upvote.
    #[arg(long)]
    pub down: bool,
}

#[derive(Debug, Args, Clone)]
pub struct ClaimBadgeArgs {
    #[arg(long, value_name = "ADDRESS")]
    pub address: String,

    /// Tier name (seedling, wooden, bronze, silver, gold) or id (1-5).
    #[arg(value_name = "TIER")]
    pub tier: BadgeTier,
}
