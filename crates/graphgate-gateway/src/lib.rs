//! graphgate-gateway: namespace-scoped gateway over the knowledge graph.
//!
//! Validates caller identifiers, gates access to namespaces that were never
//! created, and runs list / create / add-episode / search and the episode
//! maintenance operations against the shared backend handle.

pub mod error;
pub mod gateway;
pub mod registry;
pub mod requests;
pub mod response;

pub use gateway::Gateway;
pub use registry::{NamespaceRegistry, NamespaceSummary};
pub use response::{render, ErrorResponse, Status};
