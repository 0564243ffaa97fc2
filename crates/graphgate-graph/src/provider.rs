//! Lazily-initialized shared backend handle.

use tokio::sync::OnceCell;

use crate::backend::Connector;
use crate::client::GraphError;

/// Owns the one backend handle for the process.
///
/// The first `get` builds the handle; concurrent first callers wait on the
/// same construction and all receive the same handle. A failed construction
/// is not remembered, so a later `get` tries again.
pub struct ConnectionProvider<C: Connector> {
    connector: C,
    handle: OnceCell<C::Handle>,
}

impl<C: Connector> ConnectionProvider<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            handle: OnceCell::new(),
        }
    }

    /// Build around an already-connected handle.
    pub fn with_handle(connector: C, handle: C::Handle) -> Self {
        Self {
            connector,
            handle: OnceCell::new_with(Some(handle)),
        }
    }

    /// Return the shared handle, connecting on first use.
    pub async fn get(&self) -> Result<&C::Handle, GraphError> {
        self.handle
            .get_or_try_init(|| async {
                tracing::debug!("Constructing graph backend handle");
                self.connector.connect().await
            })
            .await
    }

    pub fn is_connected(&self) -> bool {
        self.handle.initialized()
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::time::{sleep, Duration};

    use super::*;

    /// Connector that counts attempts and fails the first `failures` of them.
    struct CountingConnector {
        attempts: AtomicUsize,
        failures: usize,
    }

    #[async_trait]
    impl Connector for CountingConnector {
        type Handle = Arc<usize>;

        async fn connect(&self) -> Result<Arc<usize>, GraphError> {
            let n = self.attempts.fetch_add(1, Ordering::SeqCst);
            sleep(Duration::from_millis(20)).await;
            if n < self.failures {
                return Err(GraphError::Connection("connection refused".to_string()));
            }
            Ok(Arc::new(n))
        }
    }

    fn provider(failures: usize) -> ConnectionProvider<CountingConnector> {
        ConnectionProvider::new(CountingConnector {
            attempts: AtomicUsize::new(0),
            failures,
        })
    }

    #[tokio::test]
    async fn concurrent_first_use_constructs_once() {
        let provider = Arc::new(provider(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let p = provider.clone();
            tasks.push(tokio::spawn(async move { p.get().await.map(Arc::clone) }));
        }

        let mut handles = Vec::new();
        for t in tasks {
            handles.push(t.await.unwrap().unwrap());
        }

        assert_eq!(provider.connector().attempts.load(Ordering::SeqCst), 1);
        assert!(handles.iter().all(|h| Arc::ptr_eq(h, &handles[0])));
    }

    #[tokio::test]
    async fn failure_is_not_cached() {
        let provider = provider(1);

        let err = provider.get().await.err().unwrap();
        assert!(matches!(err, GraphError::Connection(_)));
        assert!(!provider.is_connected());

        let handle = provider.get().await.unwrap();
        assert_eq!(**handle, 1);
        assert_eq!(provider.connector().attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn with_handle_skips_construction() {
        let provider = ConnectionProvider::with_handle(
            CountingConnector {
                attempts: AtomicUsize::new(0),
                failures: 0,
            },
            Arc::new(42),
        );
        assert_eq!(**provider.get().await.unwrap(), 42);
        assert_eq!(provider.connector().attempts.load(Ordering::SeqCst), 0);
    }
}
