use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub anthropic_api_key: String,
    pub payment: PaymentConfig,
    pub public_base_url: String,
    pub frontend_url: String,
    pub admin_token: String,
    pub port: u16,
    pub rust_log: String,
}

/// Gateway credentials and pricing. Split out so the payment module can be
/// handed just what it needs.
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub api_url: String,
    pub vendor_id: String,
    pub secret: String,
    /// Price charged per document, in whole currency units (XOF has no minor unit).
    pub price: i64,
    pub currency: String,
    pub webhook_tolerance_secs: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            payment: PaymentConfig {
                api_url: trim_slash(require_env("PAYMENT_API_URL")?),
                vendor_id: require_env("PAYMENT_VENDOR_ID")?,
                secret: require_env("PAYMENT_SECRET")?,
                price: parse_env("CV_PRICE", 1000)?,
                currency: std::env::var("CURRENCY").unwrap_or_else(|_| "XOF".to_string()),
                webhook_tolerance_secs: parse_env("WEBHOOK_TOLERANCE_SECS", 300)?,
            },
            public_base_url: trim_slash(require_env("PUBLIC_BASE_URL")?),
            frontend_url: trim_slash(require_env("FRONTEND_URL")?),
            admin_token: require_env("ADMIN_TOKEN")?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// URL the gateway posts payment notifications to.
    pub fn webhook_url(&self) -> String {
        format!("{}/api/v1/payments/webhook", self.public_base_url)
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

fn trim_slash(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
impl Config {
    /// Local-only settings; nothing behind these URLs is expected to answer.
    pub fn for_tests() -> Self {
        Config {
            database_url: "postgres://cv:cv@127.0.0.1:1/cv".to_string(),
            redis_url: "redis://127.0.0.1:1/".to_string(),
            s3_bucket: "cv-exports".to_string(),
            s3_endpoint: "http://127.0.0.1:1".to_string(),
            aws_access_key_id: "minio".to_string(),
            aws_secret_access_key: "minio123".to_string(),
            anthropic_api_key: "test-key".to_string(),
            payment: PaymentConfig {
                api_url: "http://127.0.0.1:1".to_string(),
                vendor_id: "vendor-1".to_string(),
                secret: "webhook-secret".to_string(),
                price: 1000,
                currency: "XOF".to_string(),
                webhook_tolerance_secs: 300,
            },
            public_base_url: "http://localhost:8080".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            admin_token: "admin-token".to_string(),
            port: 8080,
            rust_log: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_slash_removes_trailing_slashes() {
        assert_eq!(
            trim_slash("https://api.example.com//".to_string()),
            "https://api.example.com"
        );
        assert_eq!(trim_slash("http://x".to_string()), "http://x");
    }

    #[test]
    fn test_parse_env_falls_back_to_default() {
        let value: i64 = parse_env("CVCC_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }
}
