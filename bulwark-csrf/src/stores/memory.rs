//! In-memory token store
//!
//! All state lives in one `HashMap` behind one mutex: issue, check and the
//! reclaim sweep each run as a single critical section, so the same token can
//! never be consumed twice. Expired entries are refused on lookup and removed
//! by a background task spawned at construction.

use crate::config::CsrfConfig;
use crate::error::{CsrfError, CsrfResult};
use crate::stores::TokenStore;
use crate::token;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, trace};

/// Stored state of a live token
#[derive(Debug, Clone, Copy)]
struct TokenRecord {
    expires_at: Instant,
}

impl TokenRecord {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

type TokenMap = Mutex<HashMap<String, TokenRecord>>;

/// Roughly 30 years
const FAR_FUTURE_SECS: u64 = 86_400 * 365 * 30;

/// In-memory token store
pub struct MemoryStore {
    tokens: Arc<TokenMap>,
    token_ttl: Duration,
    sweeper: JoinHandle<()>,
}

impl MemoryStore {
    /// Create a store and spawn its reclaim sweep.
    ///
    /// The sweep runs every `config.reclaim_interval` until `shutdown` turns
    /// `true`, its sender is dropped, or the store itself is dropped.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn new(config: &CsrfConfig, shutdown: watch::Receiver<bool>) -> CsrfResult<Self> {
        config.validate()?;

        debug!(
            token_ttl = ?config.token_ttl,
            reclaim_interval = ?config.reclaim_interval,
            "Creating in-memory CSRF token store"
        );

        let tokens = Arc::new(Mutex::new(HashMap::new()));
        let sweeper = tokio::spawn(reclaim_loop(
            Arc::downgrade(&tokens),
            config.reclaim_interval,
            shutdown,
        ));

        Ok(Self {
            tokens,
            token_ttl: config.token_ttl,
            sweeper,
        })
    }

    /// Create a store that owns its own lifetime signal
    pub fn spawn(config: &CsrfConfig) -> CsrfResult<(Self, ShutdownHandle)> {
        let (tx, rx) = watch::channel(false);
        let store = Self::new(config, rx)?;
        Ok((store, ShutdownHandle { tx }))
    }

    /// Number of entries physically held, expired ones included
    pub fn len(&self) -> usize {
        self.tokens.lock().len()
    }

    /// Whether the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.tokens.lock().is_empty()
    }

    /// Whether the reclaim sweep is still running
    pub fn is_sweeping(&self) -> bool {
        !self.sweeper.is_finished()
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn issue(&self) -> CsrfResult<String> {
        loop {
            let candidate = token::generate()?;

            let mut tokens = self.tokens.lock();
            if let Entry::Vacant(slot) = tokens.entry(candidate) {
                let token = slot.key().clone();
                slot.insert(TokenRecord {
                    expires_at: deadline(Instant::now(), self.token_ttl),
                });
                return Ok(token);
            }
        }
    }

    async fn check(&self, token: &str) -> CsrfResult<()> {
        let mut tokens = self.tokens.lock();
        let now = Instant::now();
        // Expired entries are dropped here as well; the sweep only catches
        // the ones nobody asks about.
        match tokens.remove(token) {
            Some(record) if record.is_live(now) => Ok(()),
            _ => Err(CsrfError::InvalidToken),
        }
    }

    fn store_type(&self) -> &'static str {
        "memory"
    }
}

/// Owner side of a store's lifetime signal, see [`MemoryStore::spawn`].
///
/// Dropping the handle stops the sweep as well.
#[derive(Debug)]
pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
}

impl ShutdownHandle {
    /// Stop the reclaim sweep
    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }
}

/// `now + after`, saturating far in the future instead of overflowing
fn deadline(now: Instant, after: Duration) -> Instant {
    now.checked_add(after).unwrap_or_else(|| now + Duration::from_secs(FAR_FUTURE_SECS))
}

/// Remove every expired entry, returning (reclaimed, remaining)
fn reclaim(tokens: &TokenMap, now: Instant) -> (usize, usize) {
    let mut tokens = tokens.lock();
    let before = tokens.len();
    tokens.retain(|_, record| record.is_live(now));
    (before - tokens.len(), tokens.len())
}

async fn reclaim_loop(
    tokens: Weak<TokenMap>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    if *shutdown.borrow_and_update() {
        return;
    }

    let mut ticker = tokio::time::interval_at(deadline(Instant::now(), interval), interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    debug!(interval = ?interval, "CSRF token reclaim sweep started");

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow_and_update() {
                    break;
                }
            }
            _ = ticker.tick() => {
                let Some(tokens) = tokens.upgrade() else {
                    break;
                };
                let (reclaimed, remaining) = reclaim(&tokens, Instant::now());
                if reclaimed > 0 {
                    debug!(reclaimed, remaining, "Reclaimed expired CSRF tokens");
                } else {
                    trace!(remaining, "Reclaim sweep found nothing to remove");
                }
            }
        }
    }

    debug!("CSRF token reclaim sweep stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn config(ttl_secs: u64, interval_secs: u64) -> CsrfConfig {
        CsrfConfig::default()
            .with_token_ttl(Duration::from_secs(ttl_secs))
            .with_reclaim_interval(Duration::from_secs(interval_secs))
    }

    #[tokio::test]
    async fn test_issue_then_check_once() {
        let (store, _shutdown) = MemoryStore::spawn(&config(60, 60)).unwrap();

        let token = store.issue().await.unwrap();
        assert_eq!(store.len(), 1);

        assert!(store.check(&token).await.is_ok());
        assert_eq!(store.check(&token).await, Err(CsrfError::InvalidToken));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_token() {
        let (store, _shutdown) = MemoryStore::spawn(&config(60, 60)).unwrap();
        store.issue().await.unwrap();

        assert_eq!(store.check("nope").await, Err(CsrfError::InvalidToken));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_before_sweep() {
        // Sweep far in the future so only the lookup can reject the token
        let (store, _shutdown) = MemoryStore::spawn(&config(10, 3600)).unwrap();
        let token = store.issue().await.unwrap();

        tokio::time::advance(Duration::from_secs(10)).await;

        assert_eq!(store.check(&token).await, Err(CsrfError::InvalidToken));
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_valid_just_before_expiry() {
        let (store, _shutdown) = MemoryStore::spawn(&config(10, 3600)).unwrap();
        let token = store.issue().await.unwrap();

        tokio::time::advance(Duration::from_millis(9_999)).await;

        assert!(store.check(&token).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_reclaims_expired() {
        let (store, _shutdown) = MemoryStore::spawn(&config(1, 1)).unwrap();
        for _ in 0..50 {
            store.issue().await.unwrap();
        }
        assert_eq!(store.len(), 50);

        tokio::time::sleep(Duration::from_millis(2_500)).await;

        assert_eq!(store.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_keeps_live_tokens() {
        let (store, _shutdown) = MemoryStore::spawn(&config(60, 1)).unwrap();
        let token = store.issue().await.unwrap();

        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(store.len(), 1);
        assert!(store.check(&token).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_sweep_only() {
        let (store, shutdown) = MemoryStore::spawn(&config(1, 1)).unwrap();
        assert!(store.is_sweeping());

        shutdown.shutdown();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!store.is_sweeping());

        // Issue and check behave exactly as before
        let token = store.issue().await.unwrap();
        assert!(store.check(&token).await.is_ok());

        // Nothing reclaims expired entries any more
        store.issue().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_sender_stops_sweep() {
        let (tx, rx) = watch::channel(false);
        let store = MemoryStore::new(&config(1, 1), rx).unwrap();

        drop(tx);
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(!store.is_sweeping());
    }

    #[tokio::test]
    async fn test_already_cancelled_signal() {
        let (tx, rx) = watch::channel(true);
        let store = MemoryStore::new(&config(1, 1), rx).unwrap();
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(!store.is_sweeping());
        drop(tx);
    }

    #[test]
    fn test_deadline_saturates() {
        let now = Instant::now();
        assert_eq!(
            deadline(now, Duration::from_secs(5)),
            now + Duration::from_secs(5)
        );
        assert_eq!(
            deadline(now, Duration::MAX),
            now + Duration::from_secs(FAR_FUTURE_SECS)
        );
    }

    #[tokio::test]
    async fn test_unrepresentable_durations_rejected() {
        let huge = Duration::from_secs(u64::MAX);
        assert!(matches!(
            MemoryStore::spawn(&config(60, 60).with_token_ttl(huge)),
            Err(CsrfError::Config(_))
        ));
        assert!(matches!(
            MemoryStore::spawn(&config(60, 60).with_reclaim_interval(huge)),
            Err(CsrfError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let result = MemoryStore::spawn(&config(0, 1));
        assert!(matches!(result, Err(CsrfError::Config(_))));
    }

    #[tokio::test]
    async fn test_uniqueness() {
        let (store, _shutdown) = MemoryStore::spawn(&config(3600, 3600)).unwrap();
        let mut seen = HashSet::with_capacity(100_000);

        for _ in 0..100_000 {
            assert!(seen.insert(store.issue().await.unwrap()));
        }
        assert_eq!(store.len(), 100_000);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_check_single_winner() {
        let (store, _shutdown) = MemoryStore::spawn(&config(60, 60)).unwrap();
        let store = Arc::new(store);

        for _ in 0..200 {
            let token = store.issue().await.unwrap();

            let a = tokio::spawn({
                let store = store.clone();
                let token = token.clone();
                async move { store.check(&token).await }
            });
            let b = tokio::spawn({
                let store = store.clone();
                async move { store.check(&token).await }
            });

            let results = [a.await.unwrap(), b.await.unwrap()];
            assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
            assert!(
                results
                    .iter()
                    .any(|r| r == &Err(CsrfError::InvalidToken))
            );
        }
    }

    #[test]
    fn test_store_type() {
        tokio_test::block_on(async {
            let (store, _shutdown) = MemoryStore::spawn(&config(60, 60)).unwrap();
            assert_eq!(store.store_type(), "memory");
        });
    }
}
