//! # Bulwark CSRF Protection
//!
//! Cross-Site Request Forgery (CSRF) protection with single-use tokens.
//!
//! ## Features
//!
//! - **Single-use Tokens** - A token is accepted at most once, then deleted
//! - **Expiry** - Tokens expire after a fixed TTL; a background sweep reclaims them
//! - **Multi-source Validation** - Header, form field and request context must agree
//! - **Pluggable Storage** - Any backend implementing [`TokenStore`]
//! - **Path Exclusion** - Skip safe methods and excluded path prefixes
//!
//! ## Quick Start
//!
//! ```rust
//! use bulwark_csrf::{Csrf, CsrfConfig, MemoryStore, form_source, header_source};
//! use http::Request;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), bulwark_csrf::CsrfError> {
//! let config = CsrfConfig::default();
//! let (store, shutdown) = MemoryStore::spawn(&config)?;
//! let csrf = Csrf::new(Arc::new(store));
//!
//! // Render the token into the page
//! let token = csrf.issue_token().await?;
//!
//! // Later, the browser posts it back
//! let request = Request::post("/transfer")
//!     .header("X-Csrf-Token", token.as_str())
//!     .body(Vec::<u8>::new())
//!     .unwrap();
//!
//! csrf.validate(&request, &[&header_source(), &form_source("csrf_token")])
//!     .await?;
//!
//! // A replay is refused
//! assert!(csrf.validate(&request, &[&header_source()]).await.is_err());
//!
//! shutdown.shutdown();
//! # Ok(())
//! # }
//! ```
//!
//! ## Guarding Requests
//!
//! ```rust
//! use bulwark_csrf::{Csrf, CsrfConfig, CsrfGuard, MemoryStore, TokenStore};
//! use http::Request;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let config = CsrfConfig::default().with_exclude_paths(vec!["/webhooks".to_string()]);
//! let (store, _shutdown) = MemoryStore::spawn(&config).unwrap();
//! let store: Arc<dyn TokenStore> = Arc::new(store);
//! let guard: CsrfGuard<Vec<u8>> = CsrfGuard::from_config(Csrf::new(store), &config);
//!
//! let request = Request::post("/webhooks/github").body(Vec::new()).unwrap();
//! assert!(guard.check(&request).await.is_ok());
//!
//! let request = Request::post("/account").body(Vec::new()).unwrap();
//! let err = guard.check(&request).await.unwrap_err();
//! assert_eq!(err.status_code(), http::StatusCode::FORBIDDEN);
//! # }
//! ```

pub mod config;
pub mod error;
pub mod guard;
pub mod source;
pub mod stores;
pub mod token;
pub mod validator;

pub use config::CsrfConfig;
pub use error::{CsrfError, CsrfResult};
pub use guard::CsrfGuard;
pub use source::{
    BoxedTokenSource, ContextSource, ContextToken, FormSource, HeaderSource, TokenSource,
    context_source, form_source, header_source,
};
pub use stores::{MemoryStore, ShutdownHandle, TokenStore};
pub use validator::Csrf;
