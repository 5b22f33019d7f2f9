//! API server configuration

/// Configuration loaded once at startup
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string
    pub database_url: String,
    /// Address the HTTP server binds to
    pub bind_address: String,
    /// HMAC secret for bearer-token verification
    pub jwt_secret: String,
    /// Server-side key for the geocoding provider; empty disables the proxy
    pub geocoding_api_key: String,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// `DATABASE_URL` and `JWT_SECRET` are required; everything else has a
    /// development default.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

        let jwt_secret =
            std::env::var("JWT_SECRET").map_err(|_| anyhow::anyhow!("JWT_SECRET must be set"))?;
        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 bytes");
        }

        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let geocoding_api_key = std::env::var("GEOCODING_API_KEY").unwrap_or_default();

        Ok(Self {
            database_url,
            bind_address,
            jwt_secret,
            geocoding_api_key,
        })
    }
}
