//! # WiseNews Ingest
//!
//! Collects Hong Kong news coverage from the WiseNews portal (reached through
//! the HKU library's sign-on) and stores it in MongoDB, one collection per
//! keyword category.
//!
//! ## Features
//!
//! - Logs in through the library page and identity provider, then drives the
//!   portal's search form over WebDriver
//! - Runs several keyword categories in one session, editing the search in place
//! - Optionally emails each result set through the portal's own mailer
//! - Rebuilds article records from the viewer and stores each at most once
//! - Optional JSON export, viewer capture and offline replay of captures
//!
//! ## Usage
//!
//! ```sh
//! HKU_LOGIN=u3000000 HKU_PASSWORD=... wisenews_ingest --category suicide -d week
//! ```
//!
//! ## Architecture
//!
//! 1. **Session**: login, portal entry
//! 2. **Search**: first category searched, later ones edited in place
//! 3. **Extraction**: viewer collections aligned into article records
//! 4. **Ingestion**: unique index on `document_id`, duplicates skipped
//! 5. **Teardown**: viewer closed, logged out, browser released, always

use clap::Parser;
use std::error::Error;
use std::path::Path;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod browser;
mod cli;
mod config;
mod error;
mod ingest;
mod models;
mod outputs;
mod retry;
mod scrapers;
mod store;
mod utils;

use browser::WebDriver;
use cli::Cli;
use config::{CategoryConfig, MailSettings, RunContext};
use error::Result;
use models::SearchConfig;
use scrapers::notify::Notifier;
use scrapers::search::SearchParameterBuilder;
use scrapers::session::SessionController;
use store::{DedupStore, DocumentStore, MongoStore};
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("wisenews_ingest starting up");

    let args = Cli::parse();
    debug!(
        categories = ?args.categories,
        date_range = ?args.date_range,
        email = args.email,
        replay = ?args.replay,
        "Parsed CLI arguments"
    );

    if let Some(dir) = &args.json_output_dir {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(path = %dir, error = %e, "JSON output directory is not writable");
            return Err(e);
        }
    }

    let ctx = RunContext::from_cli(&args).await?;

    let mongo = MongoStore::connect(&args.mongo_uri, &args.database).await?;
    let mut store = DedupStore::new(mongo);

    let outcome = match (&args.replay, &args.collection) {
        (Some(path), Some(collection)) => ingest::replay_capture(
            &mut store,
            path,
            collection,
            &ctx.config.sections,
            args.json_output_dir.as_deref(),
        )
        .await
        .map(|_| ()),
        _ => run_session(&args, &ctx, &mut store).await,
    };

    store.into_inner().shutdown().await;

    match outcome {
        Ok(()) => {
            info!(elapsed = ?start_time.elapsed(), "Run complete");
            Ok(())
        }
        Err(e) => {
            error!(step = ?e.failed_step(), error = %e, "Run aborted");
            Err(e.into())
        }
    }
}

/// Resolve every requested category before any browser work starts.
fn resolve_categories<'a>(args: &Cli, ctx: &'a RunContext) -> Result<Vec<&'a CategoryConfig>> {
    args.categories
        .iter()
        .map(|key| ctx.config.category(key))
        .collect()
}

/// One browser session from login to teardown.
#[instrument(level = "info", skip_all)]
async fn run_session<S: DocumentStore>(
    args: &Cli,
    ctx: &RunContext,
    store: &mut DedupStore<S>,
) -> Result<()> {
    let categories = resolve_categories(args, ctx)?;
    let mail = if args.email { Some(ctx.mail()?) } else { None };
    let credentials = ctx.credentials()?;

    let browser = WebDriver::connect(&args.webdriver_url, &ctx.config.browser_args).await?;
    let mut session = SessionController::new(browser, ctx.config.clone());

    let outcome = async {
        session.login(credentials).await?;
        session.get_portal().await?;
        for (i, category) in categories.iter().enumerate() {
            run_category(&mut session, args, ctx, store, category, i == 0, mail).await?;
        }
        Ok::<(), error::ScrapeError>(())
    }
    .await;

    let report = session.teardown().await;
    if report.failures().count() > 0 {
        warn!(phases = ?report.failures().map(|(p, _)| *p).collect::<Vec<_>>(), "Teardown incomplete");
    }
    outcome
}

/// Search one category, optionally mail it, then extract and store it.
#[instrument(level = "info", skip_all, fields(collection = %category.collection))]
async fn run_category<S: DocumentStore>(
    session: &mut SessionController<WebDriver>,
    args: &Cli,
    ctx: &RunContext,
    store: &mut DedupStore<S>,
    category: &CategoryConfig,
    first: bool,
    mail: Option<&MailSettings>,
) -> Result<()> {
    let search = SearchConfig {
        date_range: args.date_range,
        keyword_query: category.query.clone(),
        section_filter: ctx.config.sections.clone(),
    };
    let mut builder = SearchParameterBuilder::new(&mut *session);
    if first {
        builder.search(&search).await?;
    } else {
        builder.update_search(&search).await?;
    }

    if let Some(mail) = mail {
        Notifier::new(&mut *session, mail)
            .email_results(&args.email_subject)
            .await?;
    }

    if args.skip_scrape {
        info!("Scraping skipped");
        return Ok(());
    }

    session.open_viewer().await?;
    if let Some(dir) = &args.capture_dir {
        session.capture_page(Path::new(dir), &category.collection).await?;
    }
    let extraction = session.extract(&search.section_filter).await?;
    session.close_viewer().await?;

    let report = ingest::ingest_extraction(
        store,
        &category.collection,
        &extraction,
        args.json_output_dir.as_deref(),
    )
    .await?;
    info!(
        inserted = report.inserted,
        skipped = report.skipped,
        rejected = extraction.rejected.len(),
        "Category done"
    );
    Ok(())
}
