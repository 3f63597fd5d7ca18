use serde::Deserialize;

/// Maximum token lifetime accepted when TOKENMINT_MAX_LIFETIME_HOURS is unset:
/// 90 days.
const DEFAULT_MAX_LIFETIME_HOURS: i64 = 24 * 90;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// HS256 signing key for issued bearer credentials.
    pub signing_key: String,
    /// Ceiling for caller-requested token lifetimes, in hours.
    pub max_lifetime_hours: i64,
    /// Whether the HTTP surface accepts the reserved full grant.
    /// Product concession, off by default; the operator CLI ignores it.
    pub allow_privileged_default: bool,
}

impl Config {
    pub fn max_lifetime(&self) -> chrono::Duration {
        chrono::Duration::hours(self.max_lifetime_hours)
    }
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();

    let signing_key = std::env::var("TOKENMINT_SIGNING_KEY")
        .unwrap_or_else(|_| "CHANGE_ME_DEV_SIGNING_KEY".into());

    if signing_key == "CHANGE_ME_DEV_SIGNING_KEY" {
        let env_mode = std::env::var("TOKENMINT_ENV")
            .or_else(|_| std::env::var("RUST_ENV"))
            .unwrap_or_default();
        if env_mode == "production" {
            anyhow::bail!(
                "TOKENMINT_SIGNING_KEY is still the insecure placeholder. \
                 Set a proper random key before running in production."
            );
        }
        eprintln!("⚠️  TOKENMINT_SIGNING_KEY is not set — using insecure placeholder.");
    }

    Ok(Config {
        port: std::env::var("TOKENMINT_PORT")
            .unwrap_or_else(|_| "8090".into())
            .parse()
            .unwrap_or(8090),
        database_url: std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/tokenmint".into()),
        signing_key,
        max_lifetime_hours: std::env::var("TOKENMINT_MAX_LIFETIME_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_LIFETIME_HOURS),
        allow_privileged_default: std::env::var("TOKENMINT_ALLOW_PRIVILEGED_DEFAULT")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false),
    })
}
