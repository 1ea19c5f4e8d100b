//! Command-line interface definitions.
//!
//! Secrets are read from the environment by default so that they never need
//! to appear in shell history.

use crate::models::DateRange;
use clap::Parser;

/// Command-line arguments for a WiseNews ingestion run.
///
/// # Examples
///
/// ```sh
/// # Scrape the default category for the last three days
/// wisenews_ingest
///
/// # Two categories for 2019, also emailing each result set
/// wisenews_ingest --category suicide --category helium --date-range year-2019 --email
///
/// # Ingest a previously saved viewer page without a browser
/// wisenews_ingest --replay ./captures/viewer.html --collection suicide_news
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Keyword category to search; repeat to run several in one session
    #[arg(long = "category", default_value = "suicide")]
    pub categories: Vec<String>,

    /// Date range selected in the search form
    #[arg(short, long, value_enum, default_value_t = DateRange::ThreeDays)]
    pub date_range: DateRange,

    /// Email each result set to the configured recipient
    #[arg(long)]
    pub email: bool,

    /// Subject line for result-set emails
    #[arg(long, default_value = "Suicide News")]
    pub email_subject: String,

    /// Only search (and email); do not open the viewer or store anything
    #[arg(long)]
    pub skip_scrape: bool,

    /// WebDriver server URL
    #[arg(long, env = "WEBDRIVER_URL", default_value = "http://localhost:4444")]
    pub webdriver_url: String,

    /// MongoDB connection string
    #[arg(long, env = "MONGO_URI", default_value = "mongodb://localhost:27017")]
    pub mongo_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGO_DATABASE", default_value = "wisenews")]
    pub database: String,

    /// Also write extracted articles as JSON under this directory
    #[arg(short, long)]
    pub json_output_dir: Option<String>,

    /// Save the article viewer's HTML under this directory before extraction
    #[arg(long)]
    pub capture_dir: Option<String>,

    /// Ingest a saved viewer page instead of running a browser session
    #[arg(long, requires = "collection")]
    pub replay: Option<String>,

    /// Target collection for --replay
    #[arg(long)]
    pub collection: Option<String>,

    #[arg(long, env = "HKU_LOGIN", hide_env_values = true)]
    pub hku_login: Option<String>,

    #[arg(long, env = "HKU_PASSWORD", hide_env_values = true)]
    pub hku_password: Option<String>,

    /// Sender name shown in result-set emails
    #[arg(long, env = "SENDER")]
    pub sender: Option<String>,

    #[arg(long, env = "FROM_EMAIL")]
    pub from_email: Option<String>,

    #[arg(long, env = "TO_EMAIL")]
    pub to_email: Option<String>,
}
