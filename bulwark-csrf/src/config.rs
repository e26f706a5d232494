use crate::error::{CsrfError, CsrfResult};
use serde::Deserialize;
use std::time::{Duration, Instant};

/// Default header carrying the token
pub const DEFAULT_HEADER_NAME: &str = "X-Csrf-Token";

/// Default form field carrying the token
pub const DEFAULT_FIELD_NAME: &str = "csrf_token";

/// CSRF protection configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CsrfConfig {
    /// How long an issued token stays valid
    #[serde(rename = "token_ttl_secs", with = "duration_secs")]
    pub token_ttl: Duration,

    /// Period of the background sweep removing expired tokens
    #[serde(rename = "reclaim_interval_secs", with = "duration_secs")]
    pub reclaim_interval: Duration,

    /// Header name for CSRF token
    pub header_name: String,

    /// Form field name for CSRF token
    pub field_name: String,

    /// Safe HTTP methods (not checked for CSRF)
    pub safe_methods: Vec<String>,

    /// Paths to exclude from CSRF protection
    pub exclude_paths: Vec<String>,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            token_ttl: Duration::from_secs(3600),
            reclaim_interval: Duration::from_secs(60),
            header_name: DEFAULT_HEADER_NAME.to_string(),
            field_name: DEFAULT_FIELD_NAME.to_string(),
            safe_methods: vec![
                "GET".to_string(),
                "HEAD".to_string(),
                "OPTIONS".to_string(),
                "TRACE".to_string(),
            ],
            exclude_paths: Vec::new(),
        }
    }
}

impl CsrfConfig {
    /// Create a configuration with the given lifetimes and default names
    pub fn new(token_ttl: Duration, reclaim_interval: Duration) -> CsrfResult<Self> {
        let config = Self {
            token_ttl,
            reclaim_interval,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Set token TTL
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Set reclaim interval
    pub fn with_reclaim_interval(mut self, interval: Duration) -> Self {
        self.reclaim_interval = interval;
        self
    }

    /// Set header name
    pub fn with_header_name(mut self, name: impl Into<String>) -> Self {
        self.header_name = name.into();
        self
    }

    /// Set field name
    pub fn with_field_name(mut self, name: impl Into<String>) -> Self {
        self.field_name = name.into();
        self
    }

    /// Replace safe methods
    pub fn with_safe_methods(mut self, methods: Vec<String>) -> Self {
        self.safe_methods = methods;
        self
    }

    /// Replace excluded paths
    pub fn with_exclude_paths(mut self, paths: Vec<String>) -> Self {
        self.exclude_paths = paths;
        self
    }

    /// Reject zero or unrepresentable durations and empty names
    pub fn validate(&self) -> CsrfResult<()> {
        if self.token_ttl.is_zero() {
            return Err(CsrfError::config("token TTL must be positive"));
        }
        if self.reclaim_interval.is_zero() {
            return Err(CsrfError::config("reclaim interval must be positive"));
        }
        let now = Instant::now();
        if now.checked_add(self.token_ttl).is_none() {
            return Err(CsrfError::config("token TTL is too large"));
        }
        if now.checked_add(self.reclaim_interval).is_none() {
            return Err(CsrfError::config("reclaim interval is too large"));
        }
        if self.header_name.is_empty() {
            return Err(CsrfError::config("header name must not be empty"));
        }
        if self.field_name.is_empty() {
            return Err(CsrfError::config("field name must not be empty"));
        }
        Ok(())
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
