use std::{num::NonZeroUsize, path::Path, process, sync::Arc};

use fiidbak::{
    application::{
        catalog::{CatalogLimits, CatalogService, Refresh},
        content::{ContentResolver, ResolverSettings},
        error::AppError,
        ledger::{LedgerReader, LedgerWriter},
        merge::MergePolicy,
        submit::{ImageUpload, SubmissionService},
        view::ViewQuery,
    },
    cache::{CacheConfig, CacheRegistry, persist},
    config::{self, Command, Settings, ViewArgs},
    domain::{entities::ProductDraft, types::Address},
    infra::{content_http::HttpContentStore, ledger_http::HttpLedger, telemetry},
    presentation,
};
use time::OffsetDateTime;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    let report = error.report();
    let emit = || {
        for message in &report.messages {
            error!(target = "fiidbak::main", source = report.source, "{message}");
        }
    };

    if dispatcher::has_been_set() {
        emit();
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, emit);
}

struct App {
    settings: Settings,
    catalog: CatalogService,
    submissions: SubmissionService,
    caches: Arc<CacheRegistry>,
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;
    telemetry::init(&settings.logging)?;

    let app = build_application(settings)?;
    restore_snapshot(&app).await;

    let result = dispatch(&app, cli_args.command).await;

    persist_snapshot(&app).await;
    result
}

fn build_application(settings: Settings) -> Result<App, AppError> {
    let ledger = Arc::new(HttpLedger::new(&settings.ledger)?);
    let content = Arc::new(HttpContentStore::new(&settings.content)?);

    let resolver = Arc::new(ContentResolver::new(
        content.clone(),
        ResolverSettings {
            timeout: settings.content.resolve_timeout,
            retries: settings.content.resolve_retries,
        },
    ));
    let caches = Arc::new(CacheRegistry::new(CacheConfig::from(&settings.cache)));
    let limits = CatalogLimits {
        batch_size: settings.ledger.batch_size,
        max_entities: settings.ledger.max_entities,
        concurrency: settings.content.max_concurrency,
    };

    let reader: Arc<dyn LedgerReader> = ledger.clone();
    let writer: Arc<dyn LedgerWriter> = ledger;
    let catalog = CatalogService::new(
        reader.clone(),
        resolver,
        caches.clone(),
        MergePolicy::from(&settings.display),
        limits,
    );
    let submissions = SubmissionService::new(content, reader, writer, caches.clone());

    info!(
        target = "fiidbak::main",
        ledger = %settings.ledger.url,
        gateway = %settings.content.gateway_url,
        "Application initialised"
    );

    Ok(App {
        settings,
        catalog,
        submissions,
        caches,
    })
}

/// A damaged snapshot is logged and ignored; the next fetch replaces it.
async fn restore_snapshot(app: &App) {
    let Some(path) = app.caches.config().persist_path.as_deref() else {
        return;
    };
    if let Err(err) = persist::load_into(&app.caches.products(), path).await {
        warn!(
            target = "fiidbak::main",
            error = %err,
            "Could not restore products snapshot"
        );
    }
}

async fn persist_snapshot(app: &App) {
    let Some(path) = app.caches.config().persist_path.as_deref() else {
        return;
    };
    if let Err(err) = persist::save(&app.caches.products(), path).await {
        warn!(
            target = "fiidbak::main",
            error = %err,
            "Could not save products snapshot"
        );
    }
}

async fn dispatch(app: &App, command: Command) -> Result<(), AppError> {
    match command {
        Command::Products(args) => run_products(app, args).await,
        Command::Feedback(args) => run_feedback(app, args.product_id, args.view).await,
        Command::Tier(args) => {
            let address = Address::parse(&args.address)?;
            let tier = app.catalog.user_tier(&address).await?;
            println!("{}", presentation::render_tier(&address, tier));
            Ok(())
        }
        Command::Badges(args) => {
            let address = Address::parse(&args.address)?;
            let (tier, eligible) = app.catalog.badge_status(&address).await?;
            print!("{}", presentation::render_badges(&address, tier, &eligible));
            Ok(())
        }
        Command::ClaimBadge(args) => {
            let address = Address::parse(&args.address)?;
            let receipt = app.submissions.claim_badge(&address, args.tier).await?;
            println!(
                "{}",
                presentation::render_receipt(&format!("{} badge claimed", args.tier), &receipt)
            );
            Ok(())
        }
        Command::CreateProduct(args) => {
            let owner = Address::parse(&args.owner)?;
            let image_upload = match args.image_file.as_deref() {
                Some(path) => Some(read_image(path).await?),
                None => None,
            };
            let draft = ProductDraft {
                name: args.name,
                description: args.description,
                image: args.image,
                category: args.category,
                website: args.website,
                tags: args.tags,
            };
            let receipt = app
                .submissions
                .create_product(&owner, draft, image_upload)
                .await?;
            println!("{}", presentation::render_receipt("Product created", &receipt));
            Ok(())
        }
        Command::SubmitFeedback(args) => {
            let author = Address::parse(&args.author)?;
            let receipt = app
                .submissions
                .submit_feedback(&author, args.product_id, &args.text)
                .await?;
            println!("{}", presentation::render_receipt("Feedback submitted", &receipt));
            Ok(())
        }
        Command::Vote(args) => {
            let voter = Address::parse(&args.voter)?;
            let receipt = app
                .submissions
                .cast_vote(&voter, args.product_id, args.feedback_id, !args.down)
                .await?;
            println!("{}", presentation::render_receipt("Vote cast", &receipt));
            Ok(())
        }
    }
}

async fn run_products(app: &App, args: ViewArgs) -> Result<(), AppError> {
    let query = view_query(&app.settings, &args)?;
    let view = app.catalog.product_view(&query, refresh_mode(&args)).await;
    view.ensure_available("products")?;

    if args.json {
        println!("{}", render_json(&view)?);
    } else {
        print!(
            "{}",
            presentation::render_products(&view, OffsetDateTime::now_utc())
        );
    }
    Ok(())
}

async fn run_feedback(app: &App, product_id: u64, args: ViewArgs) -> Result<(), AppError> {
    if product_id == 0 {
        return Err(AppError::validation("product id must be positive"));
    }
    let query = view_query(&app.settings, &args)?;
    let view = app
        .catalog
        .feedback_view(product_id, &query, refresh_mode(&args))
        .await;
    view.ensure_available("feedback")?;

    let product = app.catalog.product(product_id).await;
    if product.is_none()
        && view.page.total_matches == 0
        && query.search.trim().is_empty()
        && query.by.is_none()
    {
        return Err(AppError::not_found(format!("product {product_id}")));
    }

    if args.json {
        println!("{}", render_json(&view)?);
    } else {
        print!(
            "{}",
            presentation::render_feedback(product.as_ref(), &view, OffsetDateTime::now_utc())
        );
    }
    Ok(())
}

fn view_query(settings: &Settings, args: &ViewArgs) -> Result<ViewQuery, AppError> {
    let page_size = args
        .page_size
        .and_then(NonZeroUsize::new)
        .unwrap_or(settings.display.page_size);
    let mut query = ViewQuery::new(page_size);
    query.search = args.search.clone();
    query.by = args.by.as_deref().map(Address::parse).transpose()?;
    query.sort = args.sort;
    query.page = args.page;
    Ok(query)
}

fn refresh_mode(args: &ViewArgs) -> Refresh {
    if args.refresh {
        Refresh::Forced
    } else {
        Refresh::IfStale
    }
}

fn render_json<T: serde::Serialize>(value: &T) -> Result<String, AppError> {
    presentation::render_json(value)
        .map_err(|err| AppError::unexpected(format!("failed to encode output: {err}")))
}

async fn read_image(path: &Path) -> Result<ImageUpload, AppError> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| {
            AppError::validation(format!("image path {} has no file name", path.display()))
        })?
        .to_string();
    let bytes = tokio::fs::read(path).await.map_err(|err| {
        AppError::validation(format!("could not read image {}: {err}", path.display()))
    })?;
    Ok(ImageUpload { file_name, bytes })
}
