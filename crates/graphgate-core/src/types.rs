//! Core domain types for the namespace gateway.
//!
//! Identifiers are newtypes that can only be built through the validators,
//! so anything holding a `NamespaceId` or `EntityUuid` is safe to splice
//! into backend queries and storage keys.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{GatewayError, IdentifierRule, Result};
use crate::validate;

// ── Namespace ─────────────────────────────────────────────────────

/// A validated namespace (tenant / graph domain) identifier.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct NamespaceId(String);

impl NamespaceId {
    /// Parse with the general tenant grammar.
    pub fn parse(raw: &str) -> Result<Self> {
        validate::validate_tenant_id(raw).map(|s| Self(s.to_string()))
    }

    /// Parse with the stricter grammar required for new namespaces.
    pub fn parse_new(raw: &str) -> Result<Self> {
        validate::validate_new_namespace_id(raw).map(|s| Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NamespaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NamespaceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Prefix for durable namespace metadata keys.
pub const METADATA_KEY_PREFIX: &str = "graph_metadata:";

/// Durable key under which a namespace's metadata record lives.
pub fn metadata_key(ns: &NamespaceId) -> String {
    format!("{METADATA_KEY_PREFIX}{ns}")
}

/// Descriptive side record for a namespace, owned by the registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NamespaceMetadata {
    pub description: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub episode_count: u64,
}

impl NamespaceMetadata {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            created_at: Utc::now(),
            episode_count: 0,
        }
    }
}

/// Node and edge counters reported by the backend for one namespace.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NamespaceStats {
    pub node_count: i64,
    pub edge_count: i64,
}

// ── Entity identifiers ───────────────────────────────────────────

/// A validated entity (node / edge) handle.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct EntityUuid(pub Uuid);

impl EntityUuid {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = validate::validate_entity_uuid(raw)?;
        Uuid::parse_str(raw)
            .map(Self)
            .map_err(|_| GatewayError::invalid_identifier(raw, IdentifierRule::Uuid))
    }

    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityUuid {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

// ── Episodes ─────────────────────────────────────────────────────

/// Where an episode's content came from.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Text,
    Message,
    Json,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [SourceKind::Text, SourceKind::Message, SourceKind::Json];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Message => "message",
            Self::Json => "json",
        }
    }

    /// Names of all accepted source kinds, in declaration order.
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(SourceKind::as_str).collect()
    }
}

impl FromStr for SourceKind {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| GatewayError::InvalidSourceKind {
                namespace: None,
                value: s.to_string(),
            })
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A content unit accepted for ingestion into a namespace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Episode {
    pub name: String,
    pub body: String,
    pub source: SourceKind,
    pub source_description: Option<String>,
    pub reference_time: Option<DateTime<Utc>>,
}

/// Parse a caller-supplied ISO-8601 reference time.
///
/// RFC 3339 with an offset is taken as-is; a naive timestamp is read as UTC.
pub fn parse_reference_time(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| GatewayError::InvalidArgument {
            namespace: None,
            field: "reference_time",
            message: format!("{e}; use ISO format like '2025-10-26T10:30:00'"),
        })
}

/// An episode as stored by the knowledge engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EpisodeRecord {
    pub uuid: String,
    pub namespace: String,
    pub name: String,
    pub content: String,
    pub source: SourceKind,
    pub source_description: Option<String>,
    pub valid_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// What a search hit refers to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HitKind {
    Episode,
    Fact,
}

/// One search result, scoped to a single namespace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub kind: HitKind,
    pub uuid: String,
    pub name: String,
    pub snippet: String,
    pub valid_at: Option<DateTime<Utc>>,
}
