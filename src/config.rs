use std::path::PathBuf;
use std::time::Duration;

use crate::errors::AppError;
use crate::utils::normalize_base_url;

pub const DEFAULT_SESSION_COOKIE: &str = "sb-access-token";
pub const DEFAULT_PROTECTED_PREFIXES: [&str; 2] = ["/dashboard", "/onboarding"];

const DEFAULT_COLLABORATOR_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_PROXY_TIMEOUT_MS: u64 = 30_000;

/// Process-wide gateway settings, read once at startup.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Backend API base, trailing slashes stripped.
    pub backend_base_url: String,
    pub frontend_url: Option<String>,
    pub session_cookie: String,
    pub session_secret: Option<Vec<u8>>,
    pub identity_url: Option<String>,
    pub identity_api_key: Option<String>,
    pub protected_prefixes: Vec<String>,
    pub policy_file: Option<PathBuf>,
    pub collaborator_timeout: Duration,
    pub proxy_timeout: Duration,
}

impl GatewayConfig {
    pub fn new(backend_base_url: &str) -> Self {
        Self {
            backend_base_url: normalize_base_url(backend_base_url),
            frontend_url: None,
            session_cookie: DEFAULT_SESSION_COOKIE.to_string(),
            session_secret: None,
            identity_url: None,
            identity_api_key: None,
            protected_prefixes: DEFAULT_PROTECTED_PREFIXES.iter().map(|p| p.to_string()).collect(),
            policy_file: None,
            collaborator_timeout: Duration::from_millis(DEFAULT_COLLABORATOR_TIMEOUT_MS),
            proxy_timeout: Duration::from_millis(DEFAULT_PROXY_TIMEOUT_MS),
        }
    }

    pub fn from_env() -> Result<Self, AppError> {
        let backend = std::env::var("BACKEND_API_URL")
            .map_err(|_| AppError::configuration("BACKEND_API_URL not set"))?;
        if backend.trim().is_empty() {
            return Err(AppError::configuration("BACKEND_API_URL must not be empty"));
        }

        let mut config = Self::new(&backend);

        config.frontend_url = non_empty_var("FRONTEND_URL").map(|url| normalize_base_url(&url));
        config.identity_url = non_empty_var("IDENTITY_URL").map(|url| normalize_base_url(&url));
        config.identity_api_key = non_empty_var("IDENTITY_API_KEY");
        config.session_secret = non_empty_var("SESSION_JWT_SECRET").map(String::into_bytes);

        if config.identity_url.is_none() && config.session_secret.is_none() {
            return Err(AppError::configuration(
                "either SESSION_JWT_SECRET or IDENTITY_URL must be set",
            ));
        }

        if let Some(cookie) = non_empty_var("SESSION_COOKIE") {
            config.session_cookie = cookie;
        }

        if let Some(prefixes) = non_empty_var("PROTECTED_PREFIXES") {
            config.protected_prefixes = prefixes
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect();
        }

        config.policy_file = non_empty_var("POLICY_FILE").map(PathBuf::from);
        config.collaborator_timeout = duration_ms_var("COLLABORATOR_TIMEOUT_MS", DEFAULT_COLLABORATOR_TIMEOUT_MS)?;
        config.proxy_timeout = duration_ms_var("PROXY_TIMEOUT_MS", DEFAULT_PROXY_TIMEOUT_MS)?;

        Ok(config)
    }

    pub fn with_frontend_url(mut self, url: &str) -> Self {
        self.frontend_url = Some(normalize_base_url(url));
        self
    }

    pub fn with_collaborator_timeout(mut self, timeout: Duration) -> Self {
        self.collaborator_timeout = timeout;
        self
    }
}

pub fn app_port() -> u16 {
    std::env::var("APP_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8000)
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn duration_ms_var(name: &str, default_ms: u64) -> Result<Duration, AppError> {
    let millis = std::env::var(name)
        .map(|val| val.parse::<u64>())
        .unwrap_or(Ok(default_ms))
        .map_err(|_| AppError::configuration(format!("{name} must be a valid integer")))?;

    Ok(Duration::from_millis(millis))
}
