use anyhow::{bail, Context, Result};
use dss_matcher::{
    load_register_csv, CaseKey, MatchLedger, MatchQuery, MatchRecord, MatchService,
    MatcherConfig, Settings, SqliteRegister,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::env;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "usage: dss-matcher <command> <file>

commands:
  import <register.csv>   load register identities into the database
  search <query.json>     rank register identities against a query
  assign <record.json>    record a match (refused if the case is already assigned)
  exists <case.json>      has this facility case been assigned?
  status <case.json>      most advanced status for a facility case
  review <review.json>    append a review event to a match

environment:
  DSS_MATCHER_DB          SQLite database path (default: dss-matcher.db)
  DSS_MATCHER_CONFIG      optional matcher config JSON";

#[derive(Debug, Deserialize)]
struct ReviewRequest {
    match_id: i64,
    status: String,
    #[serde(default)]
    comment: Option<String>,
    reviewer: String,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dss_matcher=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = env::args().collect();
    let (command, file) = match (args.get(1), args.get(2)) {
        (Some(command), Some(file)) => (command.as_str(), Path::new(file)),
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    };

    let settings = Settings::from_env();
    let config = settings
        .load_matcher_config()
        .context("Failed to load matcher config")?;

    match command {
        "import" => run_import(&settings, &config, file),
        "search" => {
            let query: MatchQuery = read_json(file)?;
            let results = open_service(&settings, config)?.search(&query)?;
            print_json(&results)
        }
        "assign" => {
            let record: MatchRecord = read_json(file)?;
            let service = open_service(&settings, config)?;
            if service.check_exists(&record.case_key())? {
                bail!(
                    "case already assigned at facility {:?}; see `status` before re-assigning",
                    record.facility
                );
            }
            let id = service.assign_match(&record)?;
            print_json(&serde_json::json!({ "id": id }))
        }
        "exists" => {
            let key: CaseKey = read_json(file)?;
            let exists = open_service(&settings, config)?.check_exists(&key)?;
            print_json(&serde_json::json!({ "exists": exists }))
        }
        "status" => {
            let key: CaseKey = read_json(file)?;
            let status = open_service(&settings, config)?.get_status(&key)?;
            print_json(&status)
        }
        "review" => {
            let req: ReviewRequest = read_json(file)?;
            let event_id = open_service(&settings, config)?.record_review(
                req.match_id,
                &req.status,
                req.comment.as_deref(),
                &req.reviewer,
            )?;
            print_json(&serde_json::json!({ "event_id": event_id }))
        }
        other => {
            eprintln!("unknown command: {}\n\n{}", other, USAGE);
            std::process::exit(2);
        }
    }
}

fn run_import(settings: &Settings, config: &MatcherConfig, csv_path: &Path) -> Result<()> {
    let identities = load_register_csv(csv_path)
        .with_context(|| format!("Failed to read register CSV {}", csv_path.display()))?;

    let register = SqliteRegister::open(&settings.db_path, config.register_page_size)
        .context("Failed to open register database")?;
    let imported = register.import(&identities)?;
    let total = register.count()?;

    print_json(&serde_json::json!({ "imported": imported, "register_size": total }))
}

fn open_service(settings: &Settings, config: MatcherConfig) -> Result<MatchService<SqliteRegister>> {
    let register = SqliteRegister::open(&settings.db_path, config.register_page_size)
        .context("Failed to open register database")?;
    let ledger =
        MatchLedger::open(&settings.db_path, &config).context("Failed to open match ledger")?;
    Ok(MatchService::new(config, register, ledger)?)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
