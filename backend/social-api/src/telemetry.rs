/// Logging setup
///
/// ## Output
/// - `dev` / `test`: human readable lines
/// - `prod` or `LOG_FORMAT=json`: one JSON object per line on stdout, with the
///   current request span (and its correlation id) attached
///
/// ## Emails in logs
/// Addresses are never logged verbatim. Wrap them in [`LoggedEmail`], which
/// keeps only the first characters of the local part (two in `dev`, none
/// otherwise).
use crate::config::{Config, EnvState, LogFormat};
use once_cell::sync::OnceCell;
use std::fmt;
use tracing_subscriber::{fmt as tracing_fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static EMAIL_VISIBLE_CHARS: OnceCell<usize> = OnceCell::new();

/// Install the global tracing subscriber
pub fn init_tracing(config: &Config) -> anyhow::Result<()> {
    let _ = EMAIL_VISIBLE_CHARS.set(config.email_visible_chars());

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(config.env_state)));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match config.log_format {
        LogFormat::Json => registry
            .with(
                tracing_fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .try_init(),
        LogFormat::Pretty => registry.with(tracing_fmt::layer()).try_init(),
    };

    result.map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {e}"))
}

fn default_filter(env_state: EnvState) -> &'static str {
    match env_state {
        EnvState::Dev => "info,social_api=debug,actix_middleware=debug,sqlx=warn",
        EnvState::Prod | EnvState::Test => "info,sqlx=warn",
    }
}

/// Mask an email address for logging
///
/// Keeps the first `visible` characters of the local part, replaces the
/// rest with `*` and leaves `@domain` untouched.
pub fn obfuscate_email(email: &str, visible: usize) -> String {
    let (local, domain) = match email.split_once('@') {
        Some((local, domain)) => (local, Some(domain)),
        None => (email, None),
    };

    let shown: String = local.chars().take(visible).collect();
    let hidden = local.chars().count().saturating_sub(visible);

    let mut masked = shown;
    masked.push_str(&"*".repeat(hidden));
    if let Some(domain) = domain {
        masked.push('@');
        masked.push_str(domain);
    }
    masked
}

/// Display wrapper that obfuscates an email with the configured visibility
#[derive(Debug, Clone, Copy)]
pub struct LoggedEmail<'a>(pub &'a str);

impl fmt::Display for LoggedEmail<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let visible = EMAIL_VISIBLE_CHARS.get().copied().unwrap_or(0);
        f.write_str(&obfuscate_email(self.0, visible))
    }
}
