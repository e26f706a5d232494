use crate::config::CsrfConfig;
use crate::error::CsrfResult;
use crate::source::{BoxedTokenSource, FormSource, HeaderSource, TokenSource};
use crate::stores::TokenStore;
use crate::validator::Csrf;
use http::Request;

/// Request guard applying CSRF validation to state-changing requests.
///
/// Requests using a safe method, or whose path starts with an excluded
/// prefix, pass without a token. Everything else is validated against the
/// guard's sources, in order.
pub struct CsrfGuard<B, S: ?Sized = dyn TokenStore> {
    csrf: Csrf<S>,
    sources: Vec<BoxedTokenSource<B>>,
    safe_methods: Vec<String>,
    exclude_paths: Vec<String>,
}

impl<B, S> CsrfGuard<B, S>
where
    S: TokenStore + ?Sized,
{
    /// Create a guard with no sources and no unprotected requests
    pub fn new(csrf: Csrf<S>) -> Self {
        Self {
            csrf,
            sources: Vec::new(),
            safe_methods: Vec::new(),
            exclude_paths: Vec::new(),
        }
    }

    /// Create a guard reading the configured header, then the configured
    /// form field
    pub fn from_config(csrf: Csrf<S>, config: &CsrfConfig) -> Self
    where
        B: AsRef<[u8]> + 'static,
    {
        Self::new(csrf)
            .with_source(HeaderSource::new(config.header_name.clone()))
            .with_source(FormSource::new(config.field_name.clone()))
            .with_safe_methods(config.safe_methods.clone())
            .with_exclude_paths(config.exclude_paths.clone())
    }

    /// Append a token source
    pub fn with_source(mut self, source: impl TokenSource<B> + 'static) -> Self {
        self.sources.push(Box::new(source));
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

    /// Underlying validator, e.g. for issuing tokens
    pub fn csrf(&self) -> &Csrf<S> {
        &self.csrf
    }

    /// Check if request needs CSRF protection
    pub fn needs_protection(&self, request: &Request<B>) -> bool {
        let method = request.method().as_str();
        if self
            .safe_methods
            .iter()
            .any(|safe| safe.eq_ignore_ascii_case(method))
        {
            return false;
        }

        let path = request.uri().path();
        !self
            .exclude_paths
            .iter()
            .any(|excluded| path.starts_with(excluded.as_str()))
    }

    /// Validate the request if it needs protection.
    ///
    /// # Panics
    ///
    /// Panics if a protected request reaches a guard without sources.
    pub async fn check(&self, request: &Request<B>) -> CsrfResult<()> {
        if !self.needs_protection(request) {
            return Ok(());
        }

        let sources: Vec<&dyn TokenSource<B>> =
            self.sources.iter().map(|source| source.as_ref()).collect();
        self.csrf.validate(request, &sources).await
    }
}
