/// Configuration management for the social API
///
/// Values come from the process environment (a `.env` file is loaded by
/// `main` first). `ENV_STATE` selects `dev`, `prod` or `test`; each key is
/// looked up with that state's prefix (`DEV_`, `PROD_`, `TEST_`) before the
/// bare name, so `TEST_DATABASE_URL` wins over `DATABASE_URL` in tests.
use db_pool::env_utils::parse_bool;
use std::fmt;

const INSECURE_DEV_SECRET: &str = "insecure-development-secret-change-me";
const TEST_DATABASE_URL: &str = "postgres://localhost/social_api_test";
const DEV_DATABASE_URL: &str = "postgres://localhost/social_api";

/// Deployment state selected by `ENV_STATE`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvState {
    Dev,
    Prod,
    Test,
}

impl EnvState {
    pub fn parse(value: &str) -> Result<Self, String> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "dev" => Ok(EnvState::Dev),
            "prod" => Ok(EnvState::Prod),
            "test" => Ok(EnvState::Test),
            other => Err(format!(
                "ENV_STATE must be one of dev, prod, test (got '{other}')"
            )),
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            EnvState::Dev => "DEV_",
            EnvState::Prod => "PROD_",
            EnvState::Test => "TEST_",
        }
    }

    /// Characters of an email's local part left readable in logs
    pub fn email_visible_chars(&self) -> usize {
        match self {
            EnvState::Dev => 2,
            EnvState::Prod | EnvState::Test => 0,
        }
    }
}

impl fmt::Display for EnvState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EnvState::Dev => "dev",
            EnvState::Prod => "prod",
            EnvState::Test => "test",
        };
        f.write_str(name)
    }
}

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Main application configuration
#[derive(Clone)]
pub struct Config {
    pub env_state: EnvState,
    pub app: AppConfig,
    pub database: DatabaseConfig,
    /// HS256 signing secret for access and confirmation tokens
    pub secret_key: String,
    pub mail: MailSettings,
    pub image_generation: ImageGenerationSettings,
    pub storage: StorageSettings,
    pub log_format: LogFormat,
}

/// Server bind settings
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Clone)]
pub struct DatabaseConfig {
    pub url: String,
    /// Wipe all data at startup (and between tests)
    pub force_roll_back: bool,
}

/// Mailgun credentials; empty values put the mailer in no-op mode
#[derive(Clone, Default)]
pub struct MailSettings {
    pub domain: String,
    pub api_key: String,
}

/// DeepAI credentials
#[derive(Clone, Default)]
pub struct ImageGenerationSettings {
    pub api_key: String,
}

/// Google Cloud Storage bucket settings
#[derive(Debug, Clone, Default)]
pub struct StorageSettings {
    /// Path to a service-account JSON key
    pub sa_key_path: Option<String>,
    pub bucket_name: Option<String>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("env_state", &self.env_state)
            .field("app", &self.app)
            .field("database.force_roll_back", &self.database.force_roll_back)
            .field("secret_key", &"[REDACTED]")
            .field("mail.domain", &self.mail.domain)
            .field("mail.configured", &!self.mail.api_key.is_empty())
            .field(
                "image_generation.configured",
                &!self.image_generation.api_key.is_empty(),
            )
            .field("storage", &self.storage)
            .field("log_format", &self.log_format)
            .finish()
    }
}

/// Prefix-aware key lookup over some source of variables
struct EnvReader<'a, F> {
    prefix: &'static str,
    lookup: &'a F,
}

impl<'a, F> EnvReader<'a, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(&format!("{}{}", self.prefix, key))
            .or_else(|| (self.lookup)(key))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn get_bool(&self, key: &str, default: bool) -> Result<bool, String> {
        match self.get(key) {
            Some(raw) => parse_bool(&raw).ok_or_else(|| format!("{key} must be a boolean, got '{raw}'")),
            None => Ok(default),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_state = EnvState::parse(&lookup("ENV_STATE").unwrap_or_default())?;
        let env = EnvReader {
            prefix: env_state.prefix(),
            lookup: &lookup,
        };

        let (default_db_url, default_roll_back) = match env_state {
            EnvState::Test => (Some(TEST_DATABASE_URL), true),
            EnvState::Dev => (Some(DEV_DATABASE_URL), false),
            EnvState::Prod => (None, false),
        };

        let database_url = match (env.get("DATABASE_URL"), default_db_url) {
            (Some(url), _) => url,
            (None, Some(default)) => default.to_string(),
            (None, None) => return Err("DATABASE_URL must be set in prod".to_string()),
        };

        let secret_key = match env.get("SECRET_KEY") {
            Some(secret) => secret,
            None if env_state == EnvState::Prod => {
                return Err("SECRET_KEY must be set in prod".to_string())
            }
            None => INSECURE_DEV_SECRET.to_string(),
        };

        let port = match env.get("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|e| format!("Failed to parse PORT='{raw}': {e}"))?,
            None => 8000,
        };

        let log_format = match env.get("LOG_FORMAT").map(|v| v.to_ascii_lowercase()) {
            Some(v) if v == "json" => LogFormat::Json,
            Some(v) if v == "pretty" || v == "text" => LogFormat::Pretty,
            Some(other) => return Err(format!("LOG_FORMAT must be json or pretty, got '{other}'")),
            None if env_state == EnvState::Prod => LogFormat::Json,
            None => LogFormat::Pretty,
        };

        Ok(Config {
            env_state,
            app: AppConfig {
                host: env.get_or("HOST", "0.0.0.0"),
                port,
            },
            database: DatabaseConfig {
                url: database_url,
                force_roll_back: env.get_bool("DB_FORCE_ROLL_BACK", default_roll_back)?,
            },
            secret_key,
            mail: MailSettings {
                domain: env.get_or("MAILGUN_DOMAIN", ""),
                api_key: env.get_or("MAILGUN_API_KEY", ""),
            },
            image_generation: ImageGenerationSettings {
                api_key: env.get_or("DEEPAI_API_KEY", ""),
            },
            storage: StorageSettings {
                sa_key_path: env.get("GCP_SA_KEY_PATH"),
                bucket_name: env.get("GCP_BUCKET_NAME"),
            },
            log_format,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.app.host, self.app.port)
    }

    pub fn email_visible_chars(&self) -> usize {
        self.env_state.email_visible_chars()
    }

    /// True when no `SECRET_KEY` was given and the development secret is in use
    pub fn uses_insecure_secret(&self) -> bool {
        self.secret_key == INSECURE_DEV_SECRET
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(move |key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults_to_dev_state() {
        let config = load(&[]).unwrap();
        assert_eq!(config.env_state, EnvState::Dev);
        assert_eq!(config.database.url, DEV_DATABASE_URL);
        assert!(!config.database.force_roll_back);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.email_visible_chars(), 2);
        assert_eq!(config.bind_address(), "0.0.0.0:8000");
        assert!(config.uses_insecure_secret());
    }

    #[test]
    fn test_explicit_secret_is_not_flagged() {
        let config = load(&[("DEV_SECRET_KEY", "dev-only-secret")]).unwrap();
        assert_eq!(config.secret_key, "dev-only-secret");
        assert!(!config.uses_insecure_secret());
    }

    #[test]
    fn test_state_prefix_wins_over_bare_key() {
        let config = load(&[
            ("ENV_STATE", "test"),
            ("DATABASE_URL", "postgres://bare/db"),
            ("TEST_DATABASE_URL", "postgres://prefixed/db"),
            ("DEV_DATABASE_URL", "postgres://other-state/db"),
        ])
        .unwrap();

        assert_eq!(config.database.url, "postgres://prefixed/db");
        assert!(config.database.force_roll_back);
        assert_eq!(config.email_visible_chars(), 0);
    }

    #[test]
    fn test_test_state_defaults() {
        let config = load(&[("ENV_STATE", "test")]).unwrap();
        assert_eq!(config.database.url, TEST_DATABASE_URL);
        assert!(config.database.force_roll_back);
    }

    #[test]
    fn test_prod_requires_secret_and_logs_json() {
        let err = load(&[("ENV_STATE", "prod"), ("PROD_DATABASE_URL", "postgres://db/x")])
            .unwrap_err();
        assert!(err.contains("SECRET_KEY"));

        let config = load(&[
            ("ENV_STATE", "prod"),
            ("PROD_DATABASE_URL", "postgres://db/x"),
            ("PROD_SECRET_KEY", "s3cret"),
        ])
        .unwrap();
        assert_eq!(config.secret_key, "s3cret");
        assert!(!config.uses_insecure_secret());
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(load(&[("ENV_STATE", "staging")]).is_err());
        assert!(load(&[("PORT", "eighty")]).is_err());
        assert!(load(&[("DB_FORCE_ROLL_BACK", "maybe")]).is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = load(&[("SECRET_KEY", "top-secret"), ("MAILGUN_API_KEY", "key-123")]).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("top-secret"));
        assert!(!debug.contains("key-123"));
    }

    #[test]
    #[serial]
    fn test_from_env_reads_process_environment() {
        std::env::set_var("ENV_STATE", "test");
        std::env::set_var("TEST_PORT", "9123");

        let config = Config::from_env().unwrap();
        assert_eq!(config.env_state, EnvState::Test);
        assert_eq!(config.app.port, 9123);

        std::env::remove_var("ENV_STATE");
        std::env::remove_var("TEST_PORT");
    }
}
