//! Handles settings for the application.
//!
//! Settings come from an optional TOML file (`config/receipts.toml`, or the
//! path given with `--config`) overlaid with `RECEIPTS_*` environment
//! variables, sections separated by `__` (e.g. `RECEIPTS_YNAB__API_KEY`).
//! List values read from the environment are comma separated.
use std::net::IpAddr;

use clap::Parser;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "config/receipts.toml";
const ENV_PREFIX: &str = "RECEIPTS";

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
    pub bind: String,
    pub port: u16,
    pub api_key: String,
    pub api_secret: String,
    pub disable_auth: bool,
    pub trusted_ips: Vec<IpAddr>,
    pub max_file_size: usize,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            bind: "127.0.0.1".to_string(),
            port: 3000,
            api_key: String::new(),
            api_secret: String::new(),
            disable_auth: false,
            trusted_ips: Vec::new(),
            max_file_size: server::DEFAULT_MAX_FILE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Gemini {
    pub api_key: String,
    pub model: String,
    pub base_url: Option<String>,
    /// Answer from a fixture file instead of calling Gemini.
    pub use_mock: bool,
    pub mock_fixture: Option<String>,
    pub mocks_dir: String,
}

impl Default for Gemini {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: String::new(),
            base_url: None,
            use_mock: false,
            mock_fixture: None,
            mocks_dir: "dev/ai-mocks".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ynab {
    pub api_key: String,
    pub budget_id: String,
    #[serde(default)]
    pub category_groups: Vec<String>,
    #[serde(default = "default_true")]
    pub include_payees_in_prompt: bool,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Local,
    S3,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
    pub kind: StorageKind,
    #[serde(default = "default_true")]
    pub date_subdirectories: bool,
    pub directory: Option<String>,
    pub bucket: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub path_prefix: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    #[serde(default)]
    pub gemini: Gemini,
    pub ynab: Ynab,
    pub storage: Option<Storage>,
}

#[derive(Debug, Parser)]
#[command(name = "receipts", disable_version_flag = true)]
struct Args {
    /// Optional config file path (TOML).
    #[arg(long)]
    config: Option<String>,
    /// Override the listening address.
    #[arg(long)]
    bind: Option<String>,
    /// Override the listening port.
    #[arg(long)]
    port: Option<u16>,
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("app.trusted_ips")
        .with_list_parse_key("ynab.category_groups")
}

fn is_blank(value: Option<&String>) -> bool {
    value.is_none_or(|value| value.trim().is_empty())
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let args = Args::parse();
        let config_path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);

        let mut settings = Self::build(
            Config::builder()
                .add_source(File::with_name(config_path).required(false))
                .add_source(environment()),
        )?;

        if let Some(bind) = args.bind {
            settings.app.bind = bind;
        }
        if let Some(port) = args.port {
            settings.app.port = port;
        }

        Ok(settings)
    }

    fn build(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let fail = |message: &str| Err(ConfigError::Message(message.to_string()));

        if !self.app.disable_auth
            && (self.app.api_key.is_empty() || self.app.api_secret.is_empty())
        {
            return fail("app.api_key and app.api_secret are required unless app.disable_auth is set");
        }
        if !self.gemini.use_mock && (self.gemini.api_key.is_empty() || self.gemini.model.is_empty())
        {
            return fail("gemini.api_key and gemini.model are required unless gemini.use_mock is set");
        }
        if self.ynab.api_key.is_empty() || self.ynab.budget_id.is_empty() {
            return fail("ynab.api_key and ynab.budget_id are required");
        }
        if let Some(storage) = &self.storage
            && storage.kind == StorageKind::S3
            && (is_blank(storage.bucket.as_ref())
                || is_blank(storage.access_key_id.as_ref())
                || is_blank(storage.secret_access_key.as_ref()))
        {
            return fail("s3 storage requires bucket, access_key_id and secret_access_key");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use config::{FileFormat, Map};

    use super::*;

    const MINIMAL: &str = r#"
        [app]
        api_key = "key"
        api_secret = "secret"

        [gemini]
        api_key = "gemini-key"
        model = "gemini-2.0-flash"

        [ynab]
        api_key = "ynab-key"
        budget_id = "budget-1"
    "#;

    fn load(toml: &str, env: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let env: Map<String, String> = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::build(
            Config::builder()
                .add_source(File::from_str(toml, FileFormat::Toml))
                .add_source(environment().source(Some(env))),
        )
    }

    #[test]
    fn defaults_fill_the_gaps() {
        let settings = load(MINIMAL, &[]).unwrap();
        assert_eq!(settings.app.level, "info");
        assert_eq!(settings.app.bind, "127.0.0.1");
        assert_eq!(settings.app.port, 3000);
        assert_eq!(settings.app.max_file_size, 5_242_880);
        assert!(settings.ynab.include_payees_in_prompt);
        assert!(settings.ynab.category_groups.is_empty());
        assert_eq!(settings.gemini.mocks_dir, "dev/ai-mocks");
        assert!(settings.storage.is_none());
    }

    #[test]
    fn environment_overrides_file() {
        let settings = load(
            MINIMAL,
            &[
                ("RECEIPTS_APP__PORT", "8080"),
                ("RECEIPTS_YNAB__INCLUDE_PAYEES_IN_PROMPT", "false"),
                ("RECEIPTS_YNAB__CATEGORY_GROUPS", "Everyday,Bills"),
                ("RECEIPTS_APP__TRUSTED_IPS", "127.0.0.1,::1"),
            ],
        )
        .unwrap();
        assert_eq!(settings.app.port, 8080);
        assert!(!settings.ynab.include_payees_in_prompt);
        assert_eq!(settings.ynab.category_groups, ["Everyday", "Bills"]);
        assert_eq!(settings.app.trusted_ips.len(), 2);
    }

    #[test]
    fn local_storage_section() {
        let toml = format!("{MINIMAL}\n[storage]\nkind = \"local\"\ndirectory = \"/srv/receipts\"\n");
        let storage = load(&toml, &[]).unwrap().storage.unwrap();
        assert_eq!(storage.kind, StorageKind::Local);
        assert!(storage.date_subdirectories);
        assert_eq!(storage.directory.as_deref(), Some("/srv/receipts"));
    }

    #[test]
    fn s3_storage_needs_credentials() {
        let toml = format!("{MINIMAL}\n[storage]\nkind = \"s3\"\nbucket = \"receipts\"\n");
        assert!(load(&toml, &[]).is_err());
    }

    #[test]
    fn credentials_required_unless_auth_disabled() {
        let toml = MINIMAL.replace("api_secret = \"secret\"", "");
        assert!(load(&toml, &[]).is_err());
        assert!(load(&toml, &[("RECEIPTS_APP__DISABLE_AUTH", "true")]).is_ok());
    }

    #[test]
    fn mock_mode_needs_no_gemini_key() {
        let toml = MINIMAL
            .replace("api_key = \"gemini-key\"", "")
            .replace("model = \"gemini-2.0-flash\"", "use_mock = true");
        let settings = load(&toml, &[]).unwrap();
        assert!(settings.gemini.use_mock);
    }
}
