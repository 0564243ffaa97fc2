//! graphgate-core: Shared types, validation, configuration, and errors for the graphgate gateway.
//!
//! This crate provides the foundational pieces used by every graphgate component:
//! - Validated identifiers (`NamespaceId`, `EntityUuid`) and episode types
//! - Identifier grammars applied before anything reaches the backend
//! - Gateway configuration
//! - The caller-facing error taxonomy
//! - Secret redaction for log output

pub mod config;
pub mod error;
pub mod redact;
pub mod types;
pub mod validate;

pub use config::{GateFailurePolicy, GatewayConfig};
pub use error::{ErrorKind, GatewayError, IdentifierRule};
pub use types::{
    EntityUuid, Episode, EpisodeRecord, NamespaceId, NamespaceMetadata, NamespaceStats, SearchHit,
    SourceKind,
};
