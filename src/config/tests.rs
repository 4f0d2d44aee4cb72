use std::io::Write;

use clap::Parser;
use serial_test::serial;

use super::*;
use crate::application::view::SortKey;
use crate::domain::types::BadgeTier;

#[test]
fn defaults_match_documented_values() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.ledger.url.as_str(), DEFAULT_LEDGER_URL);
    assert_eq!(settings.ledger.batch_size.get(), 50);
    assert_eq!(settings.ledger.max_entities.get(), 500);
    assert_eq!(settings.content.gateway_url.as_str(), "https://ipfs.io/ipfs/");
    assert_eq!(settings.content.resolve_timeout, Duration::from_secs(10));
    assert_eq!(settings.content.resolve_retries, 1);
    assert!(settings.content.jwt.is_none());
    assert_eq!(settings.cache.stale_after_seconds.get(), 300);
    assert_eq!(settings.display.unnamed_label, "Unnamed");
    assert_eq!(settings.display.placeholder_image, "/placeholder-product.jpg");
    assert_eq!(settings.display.page_size.get(), 12);
    assert_eq!(settings.logging.level, LevelFilter::INFO);
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.ledger.url = Some("http://ledger.file/".to_string());
    raw.logging.level = Some("info".to_string());

    let overrides = GlobalOverrides {
        ledger_url: Some("http://ledger.cli/api".to_string()),
        log_level: Some("debug".to_string()),
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.ledger.url.as_str(), "http://ledger.cli/api/");
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn rejects_zero_batch_size() {
    let mut raw = RawSettings::default();
    raw.ledger.batch_size = Some(0);
    let err = Settings::from_raw(raw).expect_err("invalid");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "ledger.batch_size",
            ..
        }
    ));
}

#[test]
fn rejects_more_than_one_retry() {
    let mut raw = RawSettings::default();
    raw.content.resolve_retries = Some(3);
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn rejects_non_http_gateway() {
    let mut raw = RawSettings::default();
    raw.content.gateway_url = Some("ftp://gateway.test/".to_string());
    let err = Settings::from_raw(raw).expect_err("invalid");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "content.gateway_url",
            ..
        }
    ));
}

#[test]
fn blank_jwt_is_treated_as_missing() {
    let mut raw = RawSettings::default();
    raw.content.jwt = Some("   ".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.content.jwt.is_none());
}

#[test]
#[serial]
fn loads_file_then_environment() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("tempfile");
    writeln!(
        file,
        "[ledger]\nurl = \"http://from-file:9000\"\nbatch_size = 20\n\n[display]\npage_size = 5"
    )
    .expect("write config");

    // SAFETY: serialised with other environment-touching tests.
    unsafe { std::env::set_var("FIIDBAK__LEDGER__BATCH_SIZE", "25") };
    let args = CliArgs::parse_from([
        "fiidbak",
        "--config-file",
        file.path().to_str().expect("utf-8 path"),
        "products",
    ]);
    let loaded = load(&args);
    unsafe { std::env::remove_var("FIIDBAK__LEDGER__BATCH_SIZE") };

    let settings = loaded.expect("valid settings");
    assert_eq!(settings.ledger.url.as_str(), "http://from-file:9000/");
    assert_eq!(settings.ledger.batch_size.get(), 25);
    assert_eq!(settings.display.page_size.get(), 5);
}

#[test]
fn parse_products_arguments() {
    let args = CliArgs::parse_from([
        "fiidbak",
        "products",
        "--search",
        "widget",
        "--sort",
        "most-reviewed",
        "--page",
        "2",
        "--refresh",
    ]);

    match args.command {
        Command::Products(view) => {
            assert_eq!(view.search, "widget");
            assert_eq!(view.sort, SortKey::MostReviewed);
            assert_eq!(view.page, 2);
            assert!(view.refresh);
            assert!(!view.json);
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn global_overrides_follow_subcommand() {
    let args = CliArgs::parse_from([
        "fiidbak",
        "feedback",
        "7",
        "--ledger-url",
        "http://ledger.test",
        "--json",
    ]);

    assert_eq!(args.overrides.ledger_url.as_deref(), Some("http://ledger.test"));
    match args.command {
        Command::Feedback(feedback) => {
            assert_eq!(feedback.product_id, 7);
            assert!(feedback.view.json);
            assert_eq!(feedback.view.sort, SortKey::Newest);
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_create_product_arguments() {
    let args = CliArgs::parse_from([
        "fiidbak",
        "create-product",
        "--owner",
        "0x1111111111111111111111111111111111111111",
        "--name",
        "Widget",
        "--description",
        "Does things",
        "--tag",
        "tools",
        "--tag",
        "diy",
    ]);

    match args.command {
        Command::CreateProduct(create) => {
            assert_eq!(create.name, "Widget");
            assert_eq!(create.tags, vec!["tools".to_string(), "diy".to_string()]);
            assert!(create.image.is_none());
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn image_url_conflicts_with_image_file() {
    let result = CliArgs::try_parse_from([
        "fiidbak",
        "create-product",
        "--owner",
        "0x1111111111111111111111111111111111111111",
        "--name",
        "Widget",
        "--description",
        "Does things",
        "--image",
        "https://img.test/a.png",
        "--image-file",
        "a.png",
    ]);
    assert!(result.is_err());
}

#[test]
fn parse_vote_arguments() {
    let args = CliArgs::parse_from([
        "fiidbak",
        "vote",
        "--voter",
        "0x1111111111111111111111111111111111111111",
        "3",
        "9",
        "--down",
    ]);

    match args.command {
        Command::Vote(vote) => {
            assert_eq!(vote.product_id, 3);
            assert_eq!(vote.feedback_id, 9);
            assert!(vote.down);
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_claim_badge_by_name_or_id() {
    let args = CliArgs::parse_from([
        "fiidbak",
        "claim-badge",
        "--address",
        "0x1111111111111111111111111111111111111111",
        "bronze",
    ]);
    match args.command {
        Command::ClaimBadge(claim) => assert_eq!(claim.tier, BadgeTier::Bronze),
        _ => panic!("wrong command parsed"),
    }

    let by_id = CliArgs::try_parse_from(["fiidbak", "claim-badge", "--address", "0x1", "4"]);
    assert!(matches!(
        by_id.map(|args| args.command),
        Ok(Command::ClaimBadge(ClaimBadgeArgs { tier: BadgeTier::Silver, .. }))
    ));
    assert!(CliArgs::try_parse_from(["fiidbak", "claim-badge", "--address", "0x1", "platinum"]).is_err());
}

#[test]
fn listings_accept_contributor_filter() {
    let args = CliArgs::parse_from([
        "fiidbak",
        "feedback",
        "3",
        "--by",
        "0x2222222222222222222222222222222222222222",
    ]);
    match args.command {
        Command::Feedback(feedback) => assert_eq!(
            feedback.view.by.as_deref(),
            Some("0x2222222222222222222222222222222222222222")
        ),
        _ => panic!("wrong command parsed"),
    }
}
