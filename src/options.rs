//! Client configuration options.

use std::collections::HashMap;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1";

/// Connection options for the backend service.
///
/// # Example
/// ```rust
/// use evograph::options::ServiceOptions;
/// use std::time::Duration;
///
/// let options = ServiceOptions::new("https://analysis.internal/api/v1")
///     .with_timeout(Duration::from_secs(120))
///     .with_header("X-Request-Source".to_string(), "cli".to_string());
/// ```
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    /// Base URL for all endpoints, without a trailing slash.
    pub base_url: String,

    /// Request timeout. Streaming calls inherit it as a whole-exchange
    /// deadline; a timeout surfaces as an ordinary transport failure.
    pub timeout: Option<Duration>,

    /// HTTP proxy URL.
    pub proxy: Option<String>,

    /// Additional HTTP headers to include in every request.
    pub extra_headers: Option<HashMap<String, String>>,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
            proxy: None,
            extra_headers: None,
        }
    }
}

impl ServiceOptions {
    /// Create options pointing at the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the proxy URL.
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Set extra headers.
    pub fn with_extra_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.extra_headers = Some(headers);
        self
    }

    /// Add a single extra header.
    pub fn with_header(mut self, key: String, value: String) -> Self {
        self.extra_headers
            .get_or_insert_with(HashMap::new)
            .insert(key, value);
        self
    }
}
