use anyhow::{Context, anyhow, bail};
use repomart_core::payments::stripe::DEFAULT_API_BASE;
use repomart_core::settings::MarketplaceSettings;
use std::{
    env, fs,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Server configuration loaded from environment variables plus the
/// marketplace tunables document.
#[derive(Debug, Clone)]
pub struct Config {
    // Server settings
    pub server_host: String,
    pub server_port: u16,

    // Storage settings
    pub storage_backend: StorageBackend,
    pub database_url: Option<String>,

    // CORS settings
    pub cors_allowed_origins: Vec<String>,

    // Authentication secrets (pepper for Argon2 + HMAC key for tokens)
    pub auth_password_pepper: String,
    pub auth_token_key: String,
    pub cookie_secure: bool,

    // Payment provider
    pub payment_provider: PaymentProvider,
    pub stripe_secret_key: Option<String>,
    pub stripe_webhook_secret: String,
    pub stripe_api_base: String,

    /// Fee, price bounds, payout policy, session TTL and moderation word list.
    pub marketplace: MarketplaceSettings,
    pub marketplace_source: MarketplaceSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> anyhow::Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" | "in-memory" => Ok(Self::Memory),
            other => Err(anyhow!("unknown STORAGE_BACKEND '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentProvider {
    Stripe,
    Manual,
}

impl FromStr for PaymentProvider {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> anyhow::Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "stripe" => Ok(Self::Stripe),
            "manual" => Ok(Self::Manual),
            other => Err(anyhow!("unknown PAYMENT_PROVIDER '{other}'")),
        }
    }
}

/// Where the marketplace tunables came from, for the startup log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarketplaceSource {
    EnvPath(PathBuf),
    EnvInline,
    DefaultFile(PathBuf),
    BuiltIn,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let (mut marketplace, marketplace_source) = load_marketplace_settings()?;
        if let Ok(currency) = env::var("CURRENCY") {
            marketplace.currency = currency.trim().to_ascii_lowercase();
        }
        if let Some(hours) = parse_env::<i64>("SESSION_TTL_HOURS")? {
            marketplace.sessions.ttl_hours = hours;
        }
        marketplace
            .validate()
            .map_err(|err| anyhow!("invalid marketplace settings: {err}"))?;

        let config = Self {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: parse_env("SERVER_PORT")?.unwrap_or(3000),

            storage_backend: parse_env("STORAGE_BACKEND")?.unwrap_or(StorageBackend::Postgres),
            database_url: env::var("DATABASE_URL").ok(),

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000,http://localhost:5173".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),

            auth_password_pepper: env::var("AUTH_PASSWORD_PEPPER")
                .unwrap_or_else(|_| "change-me-password-pepper".to_string()),
            auth_token_key: env::var("AUTH_TOKEN_KEY")
                .unwrap_or_else(|_| "change-me-hmac-key".to_string()),
            cookie_secure: parse_env("COOKIE_SECURE")?.unwrap_or(false),

            payment_provider: parse_env("PAYMENT_PROVIDER")?.unwrap_or(PaymentProvider::Manual),
            stripe_secret_key: env::var("STRIPE_SECRET_KEY").ok(),
            stripe_webhook_secret: env::var("STRIPE_WEBHOOK_SECRET")
                .unwrap_or_else(|_| "change-me-webhook-secret".to_string()),
            stripe_api_base: env::var("STRIPE_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),

            marketplace,
            marketplace_source,
        };
        config.check()?;
        Ok(config)
    }

    /// Settings for tests and local runs: in-memory storage, manual payments.
    pub fn in_memory(marketplace: MarketplaceSettings) -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            storage_backend: StorageBackend::Memory,
            database_url: None,
            cors_allowed_origins: Vec::new(),
            auth_password_pepper: "test-pepper".to_string(),
            auth_token_key: "test-token-key".to_string(),
            cookie_secure: false,
            payment_provider: PaymentProvider::Manual,
            stripe_secret_key: None,
            stripe_webhook_secret: "whsec_test".to_string(),
            stripe_api_base: DEFAULT_API_BASE.to_string(),
            marketplace,
            marketplace_source: MarketplaceSource::BuiltIn,
        }
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.storage_backend == StorageBackend::Postgres && self.database_url.is_none() {
            bail!("DATABASE_URL must be set when STORAGE_BACKEND=postgres");
        }
        if self.payment_provider == PaymentProvider::Stripe && self.stripe_secret_key.is_none() {
            bail!("STRIPE_SECRET_KEY must be set when PAYMENT_PROVIDER=stripe");
        }
        Ok(())
    }

    pub fn session_ttl_seconds(&self) -> i64 {
        self.marketplace.sessions.ttl().num_seconds()
    }
}

fn parse_env<T>(name: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|err| anyhow!("invalid {name} '{raw}': {err}")),
        Err(_) => Ok(None),
    }
}

/// Load marketplace overrides. Evaluation order:
/// 1) `$MARKETPLACE_CONFIG_PATH` (TOML or JSON file),
/// 2) `$MARKETPLACE_CONFIG_JSON` (inline JSON),
/// 3) `marketplace.toml` / `config/marketplace.toml` when present,
/// 4) built-in defaults.
fn load_marketplace_settings() -> anyhow::Result<(MarketplaceSettings, MarketplaceSource)> {
    if let Ok(path) = env::var("MARKETPLACE_CONFIG_PATH") {
        let path = PathBuf::from(path);
        let settings = load_from_file(&path)?;
        return Ok((settings, MarketplaceSource::EnvPath(path)));
    }

    if let Ok(raw) = env::var("MARKETPLACE_CONFIG_JSON") {
        let settings = parse_json(&raw).context("failed to parse MARKETPLACE_CONFIG_JSON")?;
        return Ok((settings, MarketplaceSource::EnvInline));
    }

    if let Some(path) = find_default_file() {
        let settings = load_from_file(&path)?;
        return Ok((settings, MarketplaceSource::DefaultFile(path)));
    }

    Ok((MarketplaceSettings::default(), MarketplaceSource::BuiltIn))
}

fn load_from_file(path: &Path) -> anyhow::Result<MarketplaceSettings> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read marketplace config from {}", path.display()))?;

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => parse_json(&contents)
            .with_context(|| format!("invalid marketplace config {}", path.display())),
        Some("toml") => toml::from_str(&contents)
            .map_err(|err| anyhow!("invalid marketplace config {}: {}", path.display(), err)),
        _ => parse_from_str(&contents, &path.display().to_string()),
    }
}

fn parse_from_str(contents: &str, origin: &str) -> anyhow::Result<MarketplaceSettings> {
    // Try TOML first, then JSON.
    toml::from_str(contents).or_else(|toml_err| {
        serde_json::from_str(contents).map_err(|json_err| {
            anyhow!(
                "failed to parse marketplace config {}: toml error: {}; json error: {}",
                origin,
                toml_err,
                json_err
            )
        })
    })
}

fn parse_json(raw: &str) -> anyhow::Result<MarketplaceSettings> {
    serde_json::from_str(raw).map_err(|err| anyhow!("invalid marketplace config json: {err}"))
}

fn find_default_file() -> Option<PathBuf> {
    const CANDIDATES: &[&str] = &[
        "marketplace.toml",
        "marketplace.json",
        "config/marketplace.toml",
        "config/marketplace.json",
    ];

    CANDIDATES
        .iter()
        .map(Path::new)
        .find(|path| path.exists())
        .map(|path| path.to_path_buf())
}
