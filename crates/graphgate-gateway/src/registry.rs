//! Namespace registry: discovery, metadata, creation, and the strict gate.
//!
//! A namespace is known when the backend holds data for it or when a
//! metadata record was written for it by `create`. Both sources are read
//! fresh on every call; nothing here is cached across requests.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use graphgate_core::config::GateFailurePolicy;
use graphgate_core::error::Result;
use graphgate_core::{GatewayConfig, GatewayError, NamespaceId, NamespaceMetadata};
use graphgate_graph::{ConnectionProvider, Connector, NamespaceStore};

use crate::error::from_graph;

/// Shown for namespaces that have backend data but no metadata record.
pub const NO_DESCRIPTION: &str = "No description available";

/// One entry of a namespace listing.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum NamespaceSummary {
    Available {
        id: String,
        description: String,
        created_at: Option<DateTime<Utc>>,
        node_count: i64,
        edge_count: i64,
        episode_count: u64,
    },
    /// Stats or metadata could not be read; the rest of the listing stands.
    Unavailable { id: String, error: String },
}

impl NamespaceSummary {
    pub fn id(&self) -> &str {
        match self {
            Self::Available { id, .. } | Self::Unavailable { id, .. } => id,
        }
    }
}

pub struct NamespaceRegistry<C: Connector> {
    provider: Arc<ConnectionProvider<C>>,
    config: Arc<GatewayConfig>,
    default_ns: NamespaceId,
}

impl<C> NamespaceRegistry<C>
where
    C: Connector,
    C::Handle: NamespaceStore,
{
    pub fn new(provider: Arc<ConnectionProvider<C>>, config: Arc<GatewayConfig>) -> Result<Self> {
        let default_ns = config.default_namespace_id()?;
        Ok(Self {
            provider,
            config,
            default_ns,
        })
    }

    pub fn default_namespace(&self) -> &NamespaceId {
        &self.default_ns
    }

    async fn store(&self) -> Result<&C::Handle> {
        self.provider.get().await.map_err(|e| from_graph(e, None))
    }

    /// Sorted union of backend namespaces and registered metadata ids.
    pub async fn known_ids(&self) -> Result<Vec<String>> {
        let store = self.store().await?;
        let (live, registered) = tokio::join!(store.list_namespaces(), store.list_registered());

        let mut ids = BTreeSet::new();
        ids.extend(live.map_err(|e| from_graph(e, None))?);
        ids.extend(registered.map_err(|e| from_graph(e, None))?);
        Ok(ids.into_iter().collect())
    }

    pub async fn exists(&self, ns: &NamespaceId) -> Result<bool> {
        Ok(self.known_ids().await?.iter().any(|id| id == ns.as_str()))
    }

    /// Every known namespace with its description and counters.
    ///
    /// A failure to read one namespace's stats or metadata becomes an
    /// `Unavailable` entry; only a failure to enumerate namespaces at all
    /// fails the call.
    pub async fn list(&self) -> Result<Vec<NamespaceSummary>> {
        let ids = self.known_ids().await?;
        let store = self.store().await?;

        let mut summaries = Vec::with_capacity(ids.len());
        for id in ids {
            // Ids come from the backend; anything outside the tenant grammar
            // is reported rather than queried.
            let ns = match NamespaceId::parse(&id) {
                Ok(ns) => ns,
                Err(e) => {
                    summaries.push(NamespaceSummary::Unavailable {
                        id,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            let (stats, meta) = tokio::join!(store.namespace_stats(&ns), store.get_metadata(&ns));
            let summary = match (stats, meta) {
                (Ok(stats), Ok(meta)) => NamespaceSummary::Available {
                    id,
                    description: meta
                        .as_ref()
                        .map_or_else(|| NO_DESCRIPTION.to_string(), |m| m.description.clone()),
                    created_at: meta.as_ref().map(|m| m.created_at),
                    node_count: stats.node_count,
                    edge_count: stats.edge_count,
                    episode_count: meta.map_or(0, |m| m.episode_count),
                },
                (Err(e), _) | (_, Err(e)) => {
                    let err = from_graph(e, Some(&ns));
                    tracing::warn!(namespace = %ns, error = %err, "Could not fetch namespace info");
                    NamespaceSummary::Unavailable {
                        id,
                        error: format!("Could not fetch info: {err}"),
                    }
                }
            };
            summaries.push(summary);
        }

        Ok(summaries)
    }

    /// Register a new namespace. The backend graph itself appears on the
    /// first write into it.
    pub async fn create(&self, ns: &NamespaceId, description: &str) -> Result<NamespaceMetadata> {
        if self.exists(ns).await? {
            return Err(GatewayError::AlreadyExists {
                namespace: ns.to_string(),
            });
        }

        let meta = NamespaceMetadata::new(description);
        let created = self
            .store()
            .await?
            .put_metadata_if_absent(ns, &meta)
            .await
            .map_err(|e| from_graph(e, Some(ns)))?;

        if !created {
            tracing::info!(namespace = %ns, "Lost namespace creation race");
            return Err(GatewayError::AlreadyExists {
                namespace: ns.to_string(),
            });
        }

        tracing::info!(namespace = %ns, "Namespace created");
        Ok(meta)
    }

    /// Pick the namespace an operation runs against and apply the strict gate.
    ///
    /// `None` means the configured default, which never goes through the
    /// gate. With strict mode off any id is accepted.
    pub async fn resolve(&self, requested: Option<NamespaceId>) -> Result<NamespaceId> {
        let Some(ns) = requested else {
            return Ok(self.default_ns.clone());
        };

        if ns == self.default_ns || !self.config.strict_mode {
            return Ok(ns);
        }

        match self.known_ids().await {
            Ok(known) if known.iter().any(|id| id == ns.as_str()) => Ok(ns),
            Ok(known) => Err(GatewayError::UnknownNamespace {
                namespace: ns.to_string(),
                available: known,
            }),
            Err(e) => match self.config.gate_failure {
                GateFailurePolicy::AllowAndWarn => {
                    tracing::warn!(
                        namespace = %ns,
                        error = %e,
                        "Could not validate namespace existence, proceeding"
                    );
                    Ok(ns)
                }
                GateFailurePolicy::Deny => {
                    tracing::warn!(
                        namespace = %ns,
                        error = %e,
                        "Could not validate namespace existence, denying"
                    );
                    Err(GatewayError::BackendUnavailable {
                        namespace: Some(ns.to_string()),
                        message: format!("could not validate namespace existence: {e}"),
                    })
                }
            },
        }
    }

    /// Count an accepted episode against the namespace's metadata record.
    /// Best effort: a failure is logged and otherwise ignored.
    pub async fn record_episode(&self, ns: &NamespaceId) {
        let result = match self.store().await {
            Ok(store) => store
                .increment_episode_count(ns)
                .await
                .map_err(|e| from_graph(e, Some(ns))),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::warn!(namespace = %ns, error = %e, "Could not update episode count");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphgate_core::ErrorKind;
    use graphgate_graph::{MemoryBackend, MemoryConnector};

    fn registry(config: GatewayConfig) -> (NamespaceRegistry<MemoryConnector>, MemoryConnector) {
        let connector = MemoryConnector::new(MemoryBackend::new());
        let provider = Arc::new(ConnectionProvider::new(connector.clone()));
        let registry = NamespaceRegistry::new(provider, Arc::new(config)).unwrap();
        (registry, connector)
    }

    fn ns(id: &str) -> NamespaceId {
        NamespaceId::parse(id).unwrap()
    }

    #[tokio::test]
    async fn created_namespace_is_known_before_first_write() {
        let (registry, _) = registry(GatewayConfig::default());
        assert!(!registry.exists(&ns("demo-graph")).await.unwrap());

        registry.create(&ns("demo-graph"), "test").await.unwrap();
        assert!(registry.exists(&ns("demo-graph")).await.unwrap());
        assert_eq!(registry.known_ids().await.unwrap(), vec!["demo-graph"]);
    }

    #[tokio::test]
    async fn listing_falls_back_to_placeholder_description() {
        let (registry, connector) = registry(GatewayConfig::default());
        connector
            .backend()
            .insert_entity_edge(&ns("legacy"), "Alice", "Alice knows Bob");

        let list = registry.list().await.unwrap();
        assert_eq!(list.len(), 1);
        match &list[0] {
            NamespaceSummary::Available {
                description,
                created_at,
                edge_count,
                ..
            } => {
                assert_eq!(description, NO_DESCRIPTION);
                assert!(created_at.is_none());
                assert_eq!(*edge_count, 1);
            }
            other => panic!("unexpected entry: {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_that_loses_the_race_reports_already_exists() {
        let (registry, connector) = registry(GatewayConfig::default());
        connector.backend().hold_listings(2);

        let id = ns("shared");
        let (first, second) = tokio::join!(
            registry.create(&id, "first"),
            registry.create(&id, "second"),
        );

        // Both passed the existence check; the store decided the winner.
        let (winner, loser) = match (first, second) {
            (Ok(meta), Err(e)) | (Err(e), Ok(meta)) => (meta, e),
            other => panic!("expected exactly one winner: {other:?}"),
        };
        match loser {
            GatewayError::AlreadyExists { namespace } => assert_eq!(namespace, "shared"),
            other => panic!("unexpected error: {other:?}"),
        }
        let stored = connector.backend().get_metadata(&id).await.unwrap().unwrap();
        assert_eq!(stored.description, winner.description);
    }

    #[tokio::test]
    async fn resolve_without_request_uses_default() {
        let (registry, connector) = registry(GatewayConfig::default());
        assert_eq!(registry.resolve(None).await.unwrap().as_str(), "default");
        // The default never goes through the gate, so no connection is made.
        assert_eq!(connector.attempts(), 0);
    }

    #[tokio::test]
    async fn explicit_default_skips_the_gate() {
        let (registry, connector) = registry(GatewayConfig::default());
        connector.set_refuse(true);
        let resolved = registry.resolve(Some(ns("default"))).await.unwrap();
        assert_eq!(resolved.as_str(), "default");
        assert_eq!(connector.attempts(), 0);
    }

    #[tokio::test]
    async fn unknown_namespace_error_carries_known_ids() {
        let (registry, _) = registry(GatewayConfig::default());
        registry.create(&ns("work"), "work").await.unwrap();
        registry.create(&ns("personal"), "personal").await.unwrap();

        match registry.resolve(Some(ns("ghost"))).await.unwrap_err() {
            GatewayError::UnknownNamespace {
                namespace,
                available,
            } => {
                assert_eq!(namespace, "ghost");
                assert_eq!(available, vec!["personal", "work"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn gate_failure_policy_decides_when_backend_is_down() {
        let mut config = GatewayConfig::default();
        let (open, connector) = registry(config.clone());
        connector.set_refuse(true);
        assert_eq!(open.resolve(Some(ns("work"))).await.unwrap().as_str(), "work");

        config.gate_failure = GateFailurePolicy::Deny;
        let (closed, connector) = registry(config);
        connector.set_refuse(true);
        let err = closed.resolve(Some(ns("work"))).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BackendUnavailable);
        assert_eq!(err.namespace(), Some("work"));
    }

    #[tokio::test]
    async fn record_episode_bumps_registered_count() {
        let (registry, _) = registry(GatewayConfig::default());
        let id = ns("notes");
        registry.create(&id, "notes").await.unwrap();
        registry.record_episode(&id).await;
        registry.record_episode(&id).await;

        match &registry.list().await.unwrap()[0] {
            NamespaceSummary::Available { episode_count, .. } => assert_eq!(*episode_count, 2),
            other => panic!("unexpected entry: {other:?}"),
        }
    }

    #[tokio::test]
    async fn record_episode_tolerates_offline_backend() {
        let (registry, connector) = registry(GatewayConfig::default());
        let id = ns("notes");
        registry.create(&id, "notes").await.unwrap();
        connector.backend().set_offline(true);
        registry.record_episode(&id).await;
    }
}
