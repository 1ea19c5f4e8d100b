//! Runtime configuration.
//!
//! Settings come from three places:
//! - an optional YAML file (`--config`), every field of which has a default
//! - command-line flags for per-run choices (categories, date range, ...)
//! - environment-backed flags for secrets (library login, mail addresses)
//!
//! [`RunContext`] bundles the resolved values; components receive the parts
//! they need when they are constructed.

use crate::cli::Cli;
use crate::error::{Result, ScrapeError};
use crate::models::{DEFAULT_SECTIONS, KEYWORD_CATEGORIES};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub library_login_url: String,
    pub portal_url: String,
    /// Deadline for every bounded wait, in seconds.
    pub timeout_secs: u64,
    pub poll_interval_ms: u64,
    /// Pause before interacting with frames that load in stages.
    pub settle_ms: u64,
    /// Id of the region checkbox selected for every search.
    pub region: String,
    pub sections: Vec<String>,
    pub categories: BTreeMap<String, CategoryConfig>,
    pub browser_args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryConfig {
    pub collection: String,
    pub query: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            library_login_url: "https://lib.hku.hk/index.html".to_string(),
            portal_url: "http://libwisenews.wisers.net.eproxy.lib.hku.hk/?gid=HKU&user=ipaccess&pwd=ipaccess"
                .to_string(),
            timeout_secs: 60,
            poll_interval_ms: 500,
            settle_ms: 5000,
            region: "hk".to_string(),
            sections: DEFAULT_SECTIONS.iter().map(|s| s.to_string()).collect(),
            categories: builtin_categories(),
            browser_args: vec!["--incognito".to_string(), "--disable-gpu".to_string()],
        }
    }
}

fn builtin_categories() -> BTreeMap<String, CategoryConfig> {
    KEYWORD_CATEGORIES
        .iter()
        .map(|c| {
            (
                c.key.to_string(),
                CategoryConfig {
                    collection: c.collection.to_string(),
                    query: c.query.to_string(),
                },
            )
        })
        .collect()
}

impl AppConfig {
    /// Parse YAML. Categories listed in the file are added to, or replace,
    /// the built-in ones.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let mut config: AppConfig =
            serde_yaml::from_str(yaml).map_err(|e| ScrapeError::Config(e.to_string()))?;
        let mut categories = builtin_categories();
        categories.append(&mut config.categories);
        config.categories = categories;
        config.validate()?;
        Ok(config)
    }

    #[instrument(level = "info")]
    pub async fn load(path: &str) -> Result<Self> {
        let yaml = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ScrapeError::Config(format!("cannot read {path}: {e}")))?;
        let config = Self::from_yaml(&yaml)?;
        info!(path, categories = config.categories.len(), "Loaded configuration");
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("library_login_url", &self.library_login_url),
            ("portal_url", &self.portal_url),
        ] {
            Url::parse(value).map_err(|e| ScrapeError::Config(format!("{name}: {e}")))?;
        }
        if self.timeout_secs == 0 {
            return Err(ScrapeError::Config("timeout_secs must be positive".to_string()));
        }
        Ok(())
    }

    pub fn category(&self, key: &str) -> Result<&CategoryConfig> {
        self.categories
            .get(key)
            .ok_or_else(|| ScrapeError::UnknownCategory(key.to_string()))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// Library account used for the identity-provider login.
#[derive(Clone)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"***")
            .finish()
    }
}

/// Who the result-set email comes from and goes to.
#[derive(Debug, Clone)]
pub struct MailSettings {
    pub sender_name: String,
    pub sender_email: String,
    pub recipient: String,
}

/// Everything a run needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub config: AppConfig,
    pub credentials: Option<Credentials>,
    pub mail: Option<MailSettings>,
}

impl RunContext {
    pub async fn from_cli(args: &Cli) -> Result<Self> {
        let config = match &args.config {
            Some(path) => AppConfig::load(path).await?,
            None => AppConfig::default(),
        };

        let credentials = match (&args.hku_login, &args.hku_password) {
            (Some(login), Some(password)) => Some(Credentials {
                login: login.clone(),
                password: password.clone(),
            }),
            _ => None,
        };

        let mail = match (&args.sender, &args.from_email, &args.to_email) {
            (Some(name), Some(from), Some(to)) => Some(MailSettings {
                sender_name: name.clone(),
                sender_email: from.clone(),
                recipient: to.clone(),
            }),
            _ => None,
        };

        Ok(Self {
            config,
            credentials,
            mail,
        })
    }

    pub fn credentials(&self) -> Result<&Credentials> {
        self.credentials
            .as_ref()
            .ok_or_else(|| ScrapeError::Config("HKU_LOGIN and HKU_PASSWORD must be set".to_string()))
    }

    pub fn mail(&self) -> Result<&MailSettings> {
        self.mail.as_ref().ok_or_else(|| {
            ScrapeError::Config("SENDER, FROM_EMAIL and TO_EMAIL must be set to send email".to_string())
        })
    }
}
