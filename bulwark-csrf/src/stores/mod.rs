//! Token storage backends
//!
//! A backend owns issued tokens and enforces their lifetime:
//!
//! - **Memory**: a single mutex-guarded map with a background reclaim sweep
//!   (single instance only)
//!
//! Any other backend must keep the same contract: a token is accepted by
//! [`TokenStore::check`] at most once, and never after its TTL has elapsed.

mod memory;

pub use memory::{MemoryStore, ShutdownHandle};

use crate::error::CsrfResult;
use async_trait::async_trait;

/// Trait for CSRF token storage backends
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Mint a new token that is not already present in the store and
    /// record it with the configured TTL
    async fn issue(&self) -> CsrfResult<String>;

    /// Check and consume a token.
    ///
    /// Must return [`CsrfError::InvalidToken`](crate::CsrfError::InvalidToken)
    /// if the token was not found or has expired, and must delete the token
    /// in the same atomic step when it is accepted.
    async fn check(&self, token: &str) -> CsrfResult<()>;

    /// Get store type name for debugging
    fn store_type(&self) -> &'static str {
        "custom"
    }
}
