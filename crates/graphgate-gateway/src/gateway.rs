//! The externally callable operations.
//!
//! Each operation validates its inputs, resolves the namespace through the
//! registry, runs against the backend scoped to that namespace, and returns
//! a typed response. Validation and resolution failures return before any
//! backend work happens. Nothing is retried.

use std::sync::Arc;

use tracing::{instrument, Span};

use graphgate_core::error::Result;
use graphgate_core::types::parse_reference_time;
use graphgate_core::{
    EntityUuid, Episode, GatewayConfig, GatewayError, NamespaceId, SourceKind,
};
use graphgate_graph::{ConnectionProvider, Connector, KnowledgeEngine, NamespaceStore};

use crate::error::from_graph;
use crate::registry::NamespaceRegistry;
use crate::requests::{
    AddEpisodeRequest, CreateNamespaceRequest, DeleteEntityEdgeRequest, GetEpisodesRequest,
    SearchRequest,
};
use crate::response::{
    AddEpisodeResponse, CreateNamespaceResponse, DeleteEntityEdgeResponse, GetEpisodesResponse,
    ListNamespacesResponse, SearchResponse, Status,
};

/// Episodes returned by `get_episodes` when the caller gives no count.
pub const DEFAULT_LAST_N: u32 = 10;

pub struct Gateway<C: Connector> {
    provider: Arc<ConnectionProvider<C>>,
    registry: NamespaceRegistry<C>,
    config: Arc<GatewayConfig>,
}

/// Parse an optional caller-supplied namespace with the tenant grammar.
fn requested_namespace(raw: Option<&str>) -> Result<Option<NamespaceId>> {
    raw.map(NamespaceId::parse).transpose()
}

/// Attribute a validation failure to the namespace the caller asked for.
fn attributed(err: GatewayError, requested: Option<&NamespaceId>) -> GatewayError {
    match requested {
        Some(ns) => err.in_namespace(ns.as_str()),
        None => err,
    }
}

fn positive(field: &'static str, value: u32) -> Result<u32> {
    if value == 0 {
        return Err(GatewayError::InvalidArgument {
            namespace: None,
            field,
            message: "must be at least 1".to_string(),
        });
    }
    Ok(value)
}

impl<C> Gateway<C>
where
    C: Connector,
    C::Handle: NamespaceStore + KnowledgeEngine,
{
    pub fn new(config: GatewayConfig, connector: C) -> Result<Self> {
        Self::with_provider(
            Arc::new(config),
            Arc::new(ConnectionProvider::new(connector)),
        )
    }

    /// Build around a provider shared with other components.
    pub fn with_provider(
        config: Arc<GatewayConfig>,
        provider: Arc<ConnectionProvider<C>>,
    ) -> Result<Self> {
        let registry = NamespaceRegistry::new(provider.clone(), config.clone())?;
        Ok(Self {
            provider,
            registry,
            config,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn registry(&self) -> &NamespaceRegistry<C> {
        &self.registry
    }

    async fn engine(&self, ns: &NamespaceId) -> Result<&C::Handle> {
        self.provider.get().await.map_err(|e| from_graph(e, Some(ns)))
    }

    #[instrument(name = "list_namespaces", skip(self))]
    pub async fn list_namespaces(&self) -> Result<ListNamespacesResponse> {
        let namespaces = self.registry.list().await?;
        tracing::debug!(count = namespaces.len(), "Listed namespaces");
        Ok(ListNamespacesResponse::new(namespaces))
    }

    #[instrument(name = "create_namespace", skip(self, req), fields(namespace = %req.id))]
    pub async fn create_namespace(
        &self,
        req: CreateNamespaceRequest,
    ) -> Result<CreateNamespaceResponse> {
        let ns = NamespaceId::parse_new(&req.id)?;
        let meta = self.registry.create(&ns, &req.description).await?;

        Ok(CreateNamespaceResponse {
            status: Status::Success,
            message: format!("Namespace '{ns}' created successfully"),
            usage: format!("Use namespace='{ns}' in add-episode and other operations"),
            note: "The graph is initialized in the backend on the first episode",
            id: ns.to_string(),
            description: meta.description,
            created_at: meta.created_at,
        })
    }

    #[instrument(name = "add_episode", skip(self, req), fields(namespace, body_len = req.episode_body.len()))]
    pub async fn add_episode(&self, req: AddEpisodeRequest) -> Result<AddEpisodeResponse> {
        let requested = requested_namespace(req.namespace.as_deref())?;
        let tag = |e| attributed(e, requested.as_ref());
        let source: SourceKind = req.source.parse().map_err(tag)?;
        let reference_time = req
            .reference_time
            .as_deref()
            .map(parse_reference_time)
            .transpose()
            .map_err(tag)?;

        let ns = self.registry.resolve(requested).await?;
        Span::current().record("namespace", ns.as_str());

        let episode = Episode {
            name: req.name,
            body: req.episode_body,
            source,
            source_description: req.source_description,
            reference_time,
        };
        let record = self
            .engine(&ns)
            .await?
            .add_episode(&ns, &episode)
            .await
            .map_err(|e| from_graph(e, Some(&ns)))?;
        self.registry.record_episode(&ns).await;

        tracing::info!(namespace = %ns, uuid = %record.uuid, "Episode added");
        Ok(AddEpisodeResponse {
            status: Status::Success,
            message: format!("Episode '{}' added to namespace '{ns}'", episode.name),
            namespace_used: ns.to_string(),
            name: episode.name,
            uuid: record.uuid,
        })
    }

    #[instrument(name = "search", skip(self, req), fields(namespace, query_len = req.query.len()))]
    pub async fn search(&self, req: SearchRequest) -> Result<SearchResponse> {
        let requested = requested_namespace(req.namespace.as_deref())?;
        let tag = |e| attributed(e, requested.as_ref());
        if req.query.trim().is_empty() {
            return Err(tag(GatewayError::InvalidArgument {
                namespace: None,
                field: "query",
                message: "must not be empty".to_string(),
            }));
        }
        let limit =
            positive("limit", req.limit.unwrap_or(self.config.search_limit)).map_err(tag)?;

        let ns = self.registry.resolve(requested).await?;
        Span::current().record("namespace", ns.as_str());

        let results = self
            .engine(&ns)
            .await?
            .search(&ns, &req.query, limit)
            .await
            .map_err(|e| from_graph(e, Some(&ns)))?;

        tracing::debug!(namespace = %ns, hits = results.len(), "Search complete");
        Ok(SearchResponse {
            status: Status::Success,
            namespace_searched: ns.to_string(),
            query: req.query,
            results,
        })
    }

    #[instrument(name = "get_episodes", skip(self, req), fields(namespace))]
    pub async fn get_episodes(&self, req: GetEpisodesRequest) -> Result<GetEpisodesResponse> {
        let requested = requested_namespace(req.namespace.as_deref())?;
        let last_n = positive("last_n", req.last_n.unwrap_or(DEFAULT_LAST_N))
            .map_err(|e| attributed(e, requested.as_ref()))?;

        let ns = self.registry.resolve(requested).await?;
        Span::current().record("namespace", ns.as_str());

        let episodes = self
            .engine(&ns)
            .await?
            .get_episodes(&ns, last_n)
            .await
            .map_err(|e| from_graph(e, Some(&ns)))?;

        Ok(GetEpisodesResponse {
            status: Status::Success,
            namespace: ns.to_string(),
            episodes,
        })
    }

    #[instrument(name = "delete_entity_edge", skip(self, req), fields(namespace))]
    pub async fn delete_entity_edge(
        &self,
        req: DeleteEntityEdgeRequest,
    ) -> Result<DeleteEntityEdgeResponse> {
        let requested = requested_namespace(req.namespace.as_deref())?;
        let uuid = EntityUuid::parse(&req.uuid)?;

        let ns = self.registry.resolve(requested).await?;
        Span::current().record("namespace", ns.as_str());

        self.engine(&ns)
            .await?
            .delete_entity_edge(&ns, &uuid)
            .await
            .map_err(|e| from_graph(e, Some(&ns)))?;

        tracing::info!(namespace = %ns, %uuid, "Entity edge deleted");
        Ok(DeleteEntityEdgeResponse {
            status: Status::Success,
            message: format!("Entity edge '{uuid}' deleted from namespace '{ns}'"),
            namespace: ns.to_string(),
            uuid: uuid.to_string(),
        })
    }
}
