//! Neo4j connection management and shared graph client.

use std::fmt;

use async_trait::async_trait;
use neo4rs::{query, ConfigBuilder, Graph, Query};

use graphgate_core::config::BackendSettings;
use graphgate_core::redact::REDACTED;

use crate::backend::Connector;

/// Errors from graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Neo4j connection error: {0}")]
    Connection(String),

    #[error("Neo4j query error: {0}")]
    Query(#[from] neo4rs::Error),

    #[error("{what} not found: {id} in namespace {namespace}")]
    NotFound {
        what: &'static str,
        id: String,
        namespace: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

impl From<serde_json::Error> for GraphError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Configuration for connecting to Neo4j.
#[derive(Clone)]
pub struct GraphConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub max_connections: u32,
    pub fetch_size: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: "graphgate-dev".to_string(),
            max_connections: 16,
            fetch_size: 256,
        }
    }
}

impl From<&BackendSettings> for GraphConfig {
    fn from(settings: &BackendSettings) -> Self {
        Self {
            uri: settings.uri(),
            user: settings.user.clone(),
            password: settings.password.clone(),
            max_connections: settings.max_connections,
            ..Default::default()
        }
    }
}

impl fmt::Debug for GraphConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphConfig")
            .field("uri", &self.uri)
            .field("user", &self.user)
            .field("password", &REDACTED)
            .field("max_connections", &self.max_connections)
            .field("fetch_size", &self.fetch_size)
            .finish()
    }
}

/// Thread-safe Neo4j graph client with connection pooling.
///
/// Clone is cheap (inner Arc).
#[derive(Clone)]
pub struct GraphClient {
    graph: Graph,
}

impl GraphClient {
    /// Connect to Neo4j with the given configuration.
    pub async fn connect(config: &GraphConfig) -> Result<Self, GraphError> {
        let neo_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .max_connections(config.max_connections as usize)
            .fetch_size(config.fetch_size)
            .build()
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        let graph = Graph::connect(neo_config)
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        let client = Self { graph };
        client.ensure_schema().await.map_err(|e| match e {
            GraphError::Query(inner) => GraphError::Connection(inner.to_string()),
            other => other,
        })?;

        tracing::info!(uri = %config.uri, "Connected to Neo4j");
        Ok(client)
    }

    /// Create the constraints and indexes the gateway relies on.
    ///
    /// The uniqueness constraint on metadata keys is what makes
    /// `put_metadata_if_absent` atomic against concurrent creators.
    pub async fn ensure_schema(&self) -> Result<(), GraphError> {
        self.run(query(
            "CREATE CONSTRAINT namespace_metadata_key IF NOT EXISTS
             FOR (m:NamespaceMetadata) REQUIRE m.key IS UNIQUE",
        ))
        .await?;
        self.run(query(
            "CREATE INDEX episodic_group_id IF NOT EXISTS
             FOR (e:Episodic) ON (e.group_id)",
        ))
        .await?;
        Ok(())
    }

    /// Execute a write-only query (CREATE, MERGE, DELETE, SET).
    pub async fn run(&self, query: Query) -> Result<(), GraphError> {
        self.graph.run(query).await?;
        Ok(())
    }

    /// Execute a read query and collect all rows.
    pub async fn query_rows(&self, query: Query) -> Result<Vec<neo4rs::Row>, GraphError> {
        let mut stream = self.graph.execute(query).await?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Execute a read query and return the first row, if any.
    pub async fn query_one(&self, query: Query) -> Result<Option<neo4rs::Row>, GraphError> {
        let mut stream = self.graph.execute(query).await?;
        Ok(stream.next().await?)
    }
}

#[async_trait]
impl Connector for GraphConfig {
    type Handle = GraphClient;

    async fn connect(&self) -> Result<GraphClient, GraphError> {
        GraphClient::connect(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_from_backend_settings() {
        let settings = BackendSettings {
            host: "graph.internal".to_string(),
            port: 7688,
            ..Default::default()
        };
        let config = GraphConfig::from(&settings);
        assert_eq!(config.uri, "bolt://graph.internal:7688");
        assert_eq!(config.fetch_size, 256);
    }

    #[test]
    fn debug_hides_password() {
        let config = GraphConfig {
            password: "hunter2".to_string(),
            ..Default::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains(REDACTED));
    }
}
