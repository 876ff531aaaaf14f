/// Connection settings for the remote generation service.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Base URL without the `/midjourney/v2` suffix.
    pub base_url: String,
    /// Sent verbatim in the `api-key` header.
    pub api_key: String,
    /// Queue the service should use (`relax`, `fast`, `turbo`).
    pub process_mode: String,
    /// Aspect ratio sent alongside every imagine request.
    pub default_aspect_ratio: String,
}

impl RemoteConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                            | Default    |
    /// |------------------------------------|------------|
    /// | `MIDJOURNEY_API_BASE_URL`          | (required) |
    /// | `MIDJOURNEY_API_KEY`               | (empty)    |
    /// | `MIDJOURNEY_PROCESS_MODE`          | `relax`    |
    /// | `MIDJOURNEY_DEFAULT_ASPECT_RATIO`  | `1:1`      |
    pub fn from_env() -> Self {
        let base_url = std::env::var("MIDJOURNEY_API_BASE_URL")
            .expect("MIDJOURNEY_API_BASE_URL must be set");

        let api_key = std::env::var("MIDJOURNEY_API_KEY").unwrap_or_else(|_| {
            tracing::warn!("MIDJOURNEY_API_KEY not set; remote requests will be unauthenticated");
            String::new()
        });

        let process_mode =
            std::env::var("MIDJOURNEY_PROCESS_MODE").unwrap_or_else(|_| "relax".into());

        let default_aspect_ratio =
            std::env::var("MIDJOURNEY_DEFAULT_ASPECT_RATIO").unwrap_or_else(|_| "1:1".into());

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            process_mode,
            default_aspect_ratio,
        }
    }

    /// API key with everything but the last four characters hidden.
    pub fn masked_api_key(&self) -> String {
        if self.api_key.is_empty() {
            return "Not set".to_string();
        }
        let tail: String = self
            .api_key
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("***{tail}")
    }
}
