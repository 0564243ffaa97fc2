//! Read operations against Neo4j.
//!
//! Namespaces are partitions of one database: every node and relationship a
//! namespace owns carries its id in `group_id`. Namespace ids reach Cypher
//! only as parameters, never spliced into query text.

use chrono::{DateTime, Utc};
use neo4rs::query;

use graphgate_core::types::{metadata_key, HitKind, METADATA_KEY_PREFIX};
use graphgate_core::{
    EpisodeRecord, NamespaceId, NamespaceMetadata, NamespaceStats, SearchHit, SourceKind,
};

use crate::client::{GraphClient, GraphError};

/// Longest snippet returned in a search hit, in characters.
pub const SNIPPET_CHARS: usize = 200;

impl GraphClient {
    // ── Namespace Discovery ──────────────────────────────────────

    /// Distinct `group_id` values present on any node.
    pub async fn list_group_ids(&self) -> Result<Vec<String>, GraphError> {
        let q = query(
            "MATCH (n) WHERE n.group_id IS NOT NULL
             RETURN DISTINCT n.group_id AS group_id
             ORDER BY group_id",
        );

        let rows = self.query_rows(q).await?;
        let mut ids = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.get("group_id").map_err(|e| {
                GraphError::Serialization(format!("Failed to read group_id: {e}"))
            })?;
            ids.push(id);
        }
        Ok(ids)
    }

    /// Namespace ids that have a metadata record.
    pub async fn list_metadata_ids(&self) -> Result<Vec<String>, GraphError> {
        let q = query("MATCH (m:NamespaceMetadata) RETURN m.key AS key ORDER BY key");

        let rows = self.query_rows(q).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.get::<String>("key").ok())
            .filter_map(|key| key.strip_prefix(METADATA_KEY_PREFIX).map(str::to_string))
            .collect())
    }

    /// Count nodes and relationships owned by a namespace.
    pub async fn count_namespace(&self, ns: &NamespaceId) -> Result<NamespaceStats, GraphError> {
        let q = query(
            "OPTIONAL MATCH (n {group_id: $group_id})
             WITH count(n) AS nodes
             OPTIONAL MATCH ()-[r {group_id: $group_id}]->()
             RETURN nodes, count(r) AS edges",
        )
        .param("group_id", ns.to_string());

        match self.query_one(q).await? {
            Some(row) => Ok(NamespaceStats {
                node_count: row.get::<i64>("nodes").unwrap_or(0),
                edge_count: row.get::<i64>("edges").unwrap_or(0),
            }),
            None => Ok(NamespaceStats::default()),
        }
    }

    /// Read a namespace's metadata record.
    pub async fn read_metadata(
        &self,
        ns: &NamespaceId,
    ) -> Result<Option<NamespaceMetadata>, GraphError> {
        let q = query(
            "MATCH (m:NamespaceMetadata {key: $key})
             RETURN m.description AS description, m.created_at AS created_at,
                    m.episode_count AS episode_count",
        )
        .param("key", metadata_key(ns));

        let Some(row) = self.query_one(q).await? else {
            return Ok(None);
        };

        let created_at: String = row.get("created_at").map_err(|e| {
            GraphError::Serialization(format!("Failed to read created_at: {e}"))
        })?;

        Ok(Some(NamespaceMetadata {
            description: row.get("description").unwrap_or_default(),
            created_at: parse_timestamp(&created_at)?,
            episode_count: row.get::<i64>("episode_count").unwrap_or(0).max(0) as u64,
        }))
    }

    // ── Episodes ─────────────────────────────────────────────────

    /// Most recent episodes in a namespace.
    pub async fn recent_episodes(
        &self,
        ns: &NamespaceId,
        last_n: u32,
    ) -> Result<Vec<EpisodeRecord>, GraphError> {
        let q = query(
            "MATCH (e:Episodic {group_id: $group_id})
             RETURN e
             ORDER BY e.valid_at DESC
             LIMIT $limit",
        )
        .param("group_id", ns.to_string())
        .param("limit", last_n as i64);

        let rows = self.query_rows(q).await?;
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let node: neo4rs::Node = row.get("e").map_err(|e| {
                GraphError::Serialization(format!("Failed to deserialize episode: {e}"))
            })?;
            results.push(episode_from_node(&node)?);
        }
        Ok(results)
    }

    // ── Search ───────────────────────────────────────────────────

    /// Case-insensitive text search over facts and episodes in one namespace.
    ///
    /// Facts come first; the combined list is cut to `limit`.
    pub async fn search_namespace(
        &self,
        ns: &NamespaceId,
        term: &str,
        limit: u32,
    ) -> Result<Vec<SearchHit>, GraphError> {
        let facts = query(
            "MATCH ()-[r:RELATES_TO {group_id: $group_id}]->()
             WHERE toLower(r.fact) CONTAINS toLower($term)
             RETURN r.uuid AS uuid, r.name AS name, r.fact AS text, r.valid_at AS valid_at
             LIMIT $limit",
        )
        .param("group_id", ns.to_string())
        .param("term", term.to_string())
        .param("limit", limit as i64);

        let episodes = query(
            "MATCH (e:Episodic {group_id: $group_id})
             WHERE toLower(e.name) CONTAINS toLower($term)
                OR toLower(e.content) CONTAINS toLower($term)
             RETURN e.uuid AS uuid, e.name AS name, e.content AS text, e.valid_at AS valid_at
             ORDER BY e.valid_at DESC
             LIMIT $limit",
        )
        .param("group_id", ns.to_string())
        .param("term", term.to_string())
        .param("limit", limit as i64);

        let mut hits = Vec::new();
        for (kind, q) in [(HitKind::Fact, facts), (HitKind::Episode, episodes)] {
            for row in self.query_rows(q).await? {
                let text: String = row.get("text").unwrap_or_default();
                hits.push(SearchHit {
                    kind,
                    uuid: row.get("uuid").unwrap_or_default(),
                    name: row.get("name").unwrap_or_default(),
                    snippet: snippet(&text),
                    valid_at: row
                        .get::<String>("valid_at")
                        .ok()
                        .and_then(|s| parse_timestamp(&s).ok()),
                });
            }
        }
        hits.truncate(limit as usize);
        Ok(hits)
    }
}

/// Convert an `:Episodic` node into an episode record.
fn episode_from_node(node: &neo4rs::Node) -> Result<EpisodeRecord, GraphError> {
    let source: String = node.get("source").unwrap_or_default();
    let valid_at: String = node.get("valid_at").unwrap_or_default();
    let created_at: String = node.get("created_at").unwrap_or_default();
    let source_description: String = node.get("source_description").unwrap_or_default();

    Ok(EpisodeRecord {
        uuid: node.get("uuid").unwrap_or_default(),
        namespace: node.get("group_id").unwrap_or_default(),
        name: node.get("name").unwrap_or_default(),
        content: node.get("content").unwrap_or_default(),
        source: source.parse().unwrap_or(SourceKind::Text),
        source_description: Some(source_description).filter(|s| !s.is_empty()),
        valid_at: parse_timestamp(&valid_at)?,
        created_at: parse_timestamp(&created_at)?,
    })
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, GraphError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| GraphError::Serialization(format!("Invalid timestamp '{raw}': {e}")))
}

/// First `SNIPPET_CHARS` characters of `text`.
pub(crate) fn snippet(text: &str) -> String {
    match text.char_indices().nth(SNIPPET_CHARS) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}
