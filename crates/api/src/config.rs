use std::time::Duration;

/// Server configuration loaded from environment variables.
///
/// All fields except the database URL have defaults suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `60`).
    ///
    /// Must stay above the grading timeout so a slow grader degrades to
    /// placeholder feedback instead of a 408.
    pub request_timeout_secs: u64,
    /// Outbound grading webhook settings.
    pub grading: GradingConfig,
}

/// Where the grading webhook lives and how long to wait for it.
#[derive(Debug, Clone)]
pub struct GradingConfig {
    /// Absolute URL of the grader. `None` disables the grade endpoint.
    pub webhook_url: Option<String>,
    /// Per-call timeout in seconds (default: `45`).
    pub timeout_secs: u64,
}

impl GradingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `60`                       |
    /// | `GRADING_WEBHOOK_URL`  | unset                      |
    /// | `GRADING_TIMEOUT_SECS` | `45`                       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins = parse_origins(
            &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".into()),
        );

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "60".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let webhook_url = std::env::var("GRADING_WEBHOOK_URL")
            .ok()
            .and_then(|url| non_blank(&url));

        let timeout_secs: u64 = std::env::var("GRADING_TIMEOUT_SECS")
            .unwrap_or_else(|_| "45".into())
            .parse()
            .expect("GRADING_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            grading: GradingConfig {
                webhook_url,
                timeout_secs,
            },
        }
    }
}

/// Split a comma-separated origin list, dropping blanks.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
