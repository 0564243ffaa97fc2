//! graphgate-graph: graph backend access for the namespace gateway.
//!
//! All backend reads and writes flow through the `NamespaceStore` and
//! `KnowledgeEngine` seams, implemented by the Neo4j `GraphClient` and by
//! the in-process `MemoryBackend`. `ConnectionProvider` owns the one shared
//! handle per process.

pub mod backend;
pub mod client;
pub mod memory;
pub mod mutations;
pub mod provider;
pub mod queries;

pub use backend::{Connector, KnowledgeEngine, NamespaceStore};
pub use client::{GraphClient, GraphConfig, GraphError};
pub use memory::{MemoryBackend, MemoryConnector};
pub use provider::ConnectionProvider;
