use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;

pub const DEFAULT_API_PATH: &str = "rest/api/3";
pub const DEFAULT_SERVICE_DESK_PATH: &str = "rest/servicedeskapi";
pub const DEFAULT_USER_AGENT: &str = "trackerkit";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthMethod {
    /// Account email plus API token, sent as HTTP basic credentials.
    Basic { email: String },
    /// Personal access token sent as a bearer token.
    Bearer,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::Basic { .. } => "Basic",
            AuthMethod::Bearer => "Bearer",
        }
    }
}

#[derive(Clone, Debug)]
pub struct TrackerConfig {
    pub base_url: String,
    pub api_path: String,
    pub service_desk_path: String,
    pub token: String,
    pub auth_method: AuthMethod,
    pub user_agent: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl TrackerConfig {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_path: DEFAULT_API_PATH.to_string(),
            service_desk_path: DEFAULT_SERVICE_DESK_PATH.to_string(),
            token: token.into(),
            auth_method: AuthMethod::Bearer,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }

    pub fn with_basic_auth(mut self, email: impl Into<String>) -> Self {
        self.auth_method = AuthMethod::Basic {
            email: email.into(),
        };
        self
    }

    pub fn with_api_path(mut self, path: impl Into<String>) -> Self {
        self.api_path = path.into();
        self
    }

    pub fn with_service_desk_path(mut self, path: impl Into<String>) -> Self {
        self.service_desk_path = path.into();
        self
    }

    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = ua.into();
        self
    }

    pub fn with_timeout(mut self, duration: Duration) -> Self {
        self.timeout = duration;
        self
    }

    pub fn with_connect_timeout(mut self, duration: Duration) -> Self {
        self.connect_timeout = duration;
        self
    }

    /// Value of the `Authorization` header for the configured auth method.
    pub fn authorization(&self) -> String {
        match &self.auth_method {
            AuthMethod::Basic { email } => {
                let credentials = format!("{}:{}", email, self.token);
                format!("Basic {}", BASE64_STANDARD.encode(credentials))
            }
            AuthMethod::Bearer => format!("Bearer {}", self.token),
        }
    }

    pub fn api_root(&self) -> String {
        join_root(&self.base_url, &self.api_path)
    }

    pub fn service_desk_root(&self) -> String {
        join_root(&self.base_url, &self.service_desk_path)
    }
}

fn join_root(base: &str, path: &str) -> String {
    format!(
        "{}/{}/",
        base.trim_end_matches('/'),
        path.trim_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roots_normalize_slashes() {
        let config = TrackerConfig::new("https://example.test/", "t")
            .with_api_path("/rest/api/2/");
        assert_eq!(config.api_root(), "https://example.test/rest/api/2/");
        assert_eq!(
            config.service_desk_root(),
            "https://example.test/rest/servicedeskapi/"
        );
    }

    #[test]
    fn basic_auth_encodes_email_and_token() {
        let config = TrackerConfig::new("https://example.test", "secret")
            .with_basic_auth("me@example.test");
        assert_eq!(
            config.authorization(),
            "Basic bWVAZXhhbXBsZS50ZXN0OnNlY3JldA=="
        );
    }

    #[test]
    fn bearer_is_default() {
        let config = TrackerConfig::new("https://example.test", "abc");
        assert_eq!(config.authorization(), "Bearer abc");
        assert_eq!(config.auth_method.as_str(), "Bearer");
    }
}
