use crate::error::{CsrfError, CsrfResult};
use crate::source::TokenSource;
use crate::stores::TokenStore;
use http::Request;
use std::sync::Arc;

/// CSRF token issuer and validator backed by a [`TokenStore`]
pub struct Csrf<S: ?Sized = dyn TokenStore> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for Csrf<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: TokenStore + ?Sized> Csrf<S> {
    /// Create a validator over the given store
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Backing store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Mint a new token and record it in the store
    pub async fn issue_token(&self) -> CsrfResult<String> {
        self.store.issue().await
    }

    /// Extract the token from `sources` and consume it from the store.
    ///
    /// Every non-empty candidate must be identical, otherwise
    /// [`CsrfError::InconsistentSources`] is returned without touching the
    /// store. If no source yields a token the result is
    /// [`CsrfError::InvalidToken`], again without a store lookup.
    ///
    /// # Panics
    ///
    /// Panics if `sources` is empty.
    pub async fn validate<B>(
        &self,
        request: &Request<B>,
        sources: &[&dyn TokenSource<B>],
    ) -> CsrfResult<()> {
        assert!(
            !sources.is_empty(),
            "at least one CSRF token source is required"
        );

        let token = reconcile(sources.iter().map(|source| source.extract(request)))?;
        self.store.check(&token).await
    }
}

/// Pick the token all non-empty candidates agree on
fn reconcile<I>(candidates: I) -> CsrfResult<String>
where
    I: IntoIterator<Item = Option<String>>,
{
    let mut token: Option<String> = None;

    for candidate in candidates.into_iter().flatten() {
        if candidate.is_empty() {
            continue;
        }
        match &token {
            None => token = Some(candidate),
            Some(reference) if *reference != candidate => {
                return Err(CsrfError::InconsistentSources);
            }
            Some(_) => {}
        }
    }

    token.ok_or(CsrfError::InvalidToken)
}
