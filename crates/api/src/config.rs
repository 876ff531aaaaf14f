use imagine_remote::RemoteConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the remote service location have defaults suitable
/// for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Job store records untouched for this long are swept (default: `24`).
    pub job_retention_hours: i64,
    /// How often the job store sweeper runs (default: `3600`).
    pub job_sweep_interval_secs: u64,
    /// Remote generation service settings.
    pub remote: RemoteConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                    |
    /// |---------------------------|----------------------------|
    /// | `HOST`                    | `0.0.0.0`                  |
    /// | `PORT`                    | `3000`                     |
    /// | `CORS_ORIGINS`            | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`    | `30`                       |
    /// | `JOB_RETENTION_HOURS`     | `24`                       |
    /// | `JOB_SWEEP_INTERVAL_SECS` | `3600`                     |
    ///
    /// See [`RemoteConfig::from_env`] for the remote service variables.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let job_retention_hours: i64 = std::env::var("JOB_RETENTION_HOURS")
            .unwrap_or_else(|_| "24".into())
            .parse()
            .expect("JOB_RETENTION_HOURS must be a valid i64");

        let job_sweep_interval_secs: u64 = std::env::var("JOB_SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| "3600".into())
            .parse()
            .expect("JOB_SWEEP_INTERVAL_SECS must be a valid u64");

        let remote = RemoteConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            job_retention_hours,
            job_sweep_interval_secs,
            remote,
        }
    }
}
