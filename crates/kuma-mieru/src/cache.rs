//! Request-scoped memoization.
//!
//! A [`RequestScope`] lives for one inbound request. Each operation has its
//! own table keyed by page id, so the effective key is `(operation, page id)`.
//! Entries are write-once: concurrent callers for the same key wait on the
//! first computation instead of starting their own.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};

use crate::error::MieruError;
use crate::types::{GlobalConfig, PageTabMeta, PreloadPayload};

/// Outcome of one preload resolution, shared between callers.
pub type SharedPreload = Result<Arc<PreloadPayload>, Arc<MieruError>>;

/// Write-once table for one operation.
pub struct Memo<V> {
    operation: &'static str,
    entries: Mutex<HashMap<String, Arc<OnceCell<V>>>>,
    computed: AtomicU64,
}

impl<V: Clone> Memo<V> {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            entries: Mutex::new(HashMap::new()),
            computed: AtomicU64::new(0),
        }
    }

    /// Return the value for `page_id`, running `init` only if no caller has
    /// produced it yet in this scope.
    pub async fn get_or_init<F, Fut>(&self, page_id: &str, init: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let cell = {
            let mut entries = self.entries.lock().await;
            entries.entry(page_id.to_string()).or_default().clone()
        };

        let value = cell
            .get_or_init(|| async {
                self.computed.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("{}({page_id}) computed", self.operation);
                init().await
            })
            .await;
        value.clone()
    }

    /// Number of times an initializer actually ran.
    pub fn computed(&self) -> u64 {
        self.computed.load(Ordering::Relaxed)
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Per-request cache. Create one per inbound request and drop it with the
/// request; nothing here is shared across requests.
pub struct RequestScope {
    pub preload: Memo<SharedPreload>,
    pub global_config: Memo<GlobalConfig>,
    pub page_tabs: Memo<Vec<PageTabMeta>>,
}

impl RequestScope {
    pub fn new() -> Self {
        Self {
            preload: Memo::new("preload"),
            global_config: Memo::new("global_config"),
            page_tabs: Memo::new("page_tabs"),
        }
    }
}

impl Default for RequestScope {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[tokio::test]
    async fn test_second_call_is_memoized() {
        let memo: Memo<u32> = Memo::new("test");
        let calls = AtomicUsize::new(0);

        let a = memo
            .get_or_init("main", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                7
            })
            .await;
        let b = memo
            .get_or_init("main", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                8
            })
            .await;

        assert_eq!((a, b), (7, 7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(memo.computed(), 1);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let memo: Memo<String> = Memo::new("test");
        let a = memo.get_or_init("a", || async { "A".to_string() }).await;
        let b = memo.get_or_init("b", || async { "B".to_string() }).await;
        assert_eq!((a.as_str(), b.as_str()), ("A", "B"));
        assert_eq!(memo.len().await, 2);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_computation() {
        let memo: Arc<Memo<u64>> = Arc::new(Memo::new("test"));
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let memo = memo.clone();
                let calls = calls.clone();
                tokio::spawn(async move {
                    memo.get_or_init("main", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        42
                    })
                    .await
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_errors_are_memoized_too() {
        let scope = RequestScope::new();
        let first: SharedPreload = scope
            .preload
            .get_or_init("main", || async {
                Err(Arc::new(MieruError::configuration("boom")))
            })
            .await;
        let second = scope
            .preload
            .get_or_init("main", || async { Ok(Arc::new(PreloadPayload::default())) })
            .await;
        assert!(first.is_err());
        assert!(second.is_err());
        assert_eq!(scope.preload.computed(), 1);
    }

    #[tokio::test]
    async fn test_fresh_scope_recomputes() {
        for _ in 0..2 {
            let scope = RequestScope::new();
            assert!(scope.page_tabs.is_empty().await);
            scope.page_tabs.get_or_init("*", || async { Vec::new() }).await;
            assert_eq!(scope.page_tabs.computed(), 1);
        }
    }
}
