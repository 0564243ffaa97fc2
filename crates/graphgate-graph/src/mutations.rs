//! Write operations against Neo4j.
//!
//! Episodes are created under their namespace's `group_id`. Metadata records
//! live on `:NamespaceMetadata` nodes keyed by `graph_metadata:<id>`.

use chrono::Utc;
use neo4rs::query;
use uuid::Uuid;

use graphgate_core::types::metadata_key;
use graphgate_core::{EntityUuid, Episode, EpisodeRecord, NamespaceId, NamespaceMetadata};

use crate::client::{GraphClient, GraphError};

impl GraphClient {
    // ── Namespace Metadata ───────────────────────────────────────

    /// Create the metadata record for `ns` unless one already exists.
    ///
    /// `MERGE` on the uniquely-constrained key is atomic; the per-call claim
    /// token tells this caller whether its `ON CREATE` branch ran.
    pub async fn create_metadata(
        &self,
        ns: &NamespaceId,
        meta: &NamespaceMetadata,
    ) -> Result<bool, GraphError> {
        let claim = Uuid::new_v4().to_string();
        let q = query(
            "MERGE (m:NamespaceMetadata {key: $key})
             ON CREATE SET
               m.description = $description, m.created_at = $created_at,
               m.episode_count = $episode_count, m.claim = $claim
             RETURN m.claim = $claim AS created",
        )
        .param("key", metadata_key(ns))
        .param("description", meta.description.clone())
        .param("created_at", meta.created_at.to_rfc3339())
        .param("episode_count", meta.episode_count as i64)
        .param("claim", claim);

        match self.query_one(q).await? {
            Some(row) => Ok(row.get::<bool>("created").unwrap_or(false)),
            None => Ok(false),
        }
    }

    /// Increment `episode_count` on an existing metadata record.
    pub async fn bump_episode_count(&self, ns: &NamespaceId) -> Result<(), GraphError> {
        let q = query(
            "MATCH (m:NamespaceMetadata {key: $key})
             SET m.episode_count = coalesce(m.episode_count, 0) + 1",
        )
        .param("key", metadata_key(ns));

        self.run(q).await
    }

    // ── Episodes ─────────────────────────────────────────────────

    /// Store an episode node in a namespace.
    ///
    /// The backend has no separate "create graph" step: the first episode
    /// written under a `group_id` is what brings the namespace into being.
    pub async fn create_episode(
        &self,
        ns: &NamespaceId,
        episode: &Episode,
    ) -> Result<EpisodeRecord, GraphError> {
        let now = Utc::now();
        let record = EpisodeRecord {
            uuid: EntityUuid::new().to_string(),
            namespace: ns.to_string(),
            name: episode.name.clone(),
            content: episode.body.clone(),
            source: episode.source,
            source_description: episode.source_description.clone(),
            valid_at: episode.reference_time.unwrap_or(now),
            created_at: now,
        };

        let q = query(
            "CREATE (e:Episodic {
               uuid: $uuid, group_id: $group_id, name: $name, content: $content,
               source: $source, source_description: $source_description,
               valid_at: $valid_at, created_at: $created_at
             })",
        )
        .param("uuid", record.uuid.clone())
        .param("group_id", record.namespace.clone())
        .param("name", record.name.clone())
        .param("content", record.content.clone())
        .param("source", record.source.to_string())
        .param("source_description", opt_string(&record.source_description))
        .param("valid_at", record.valid_at.to_rfc3339())
        .param("created_at", record.created_at.to_rfc3339());

        self.run(q).await?;
        Ok(record)
    }

    // ── Entity Edges ─────────────────────────────────────────────

    /// Delete a `RELATES_TO` edge by uuid, scoped to a namespace.
    pub async fn remove_entity_edge(
        &self,
        ns: &NamespaceId,
        uuid: &EntityUuid,
    ) -> Result<(), GraphError> {
        let q = query(
            "MATCH ()-[r:RELATES_TO {uuid: $uuid, group_id: $group_id}]->()
             DELETE r
             RETURN count(*) AS deleted",
        )
        .param("uuid", uuid.to_string())
        .param("group_id", ns.to_string());

        let deleted = match self.query_one(q).await? {
            Some(row) => row.get::<i64>("deleted").unwrap_or(0),
            None => 0,
        };

        if deleted == 0 {
            return Err(GraphError::NotFound {
                what: "Entity edge",
                id: uuid.to_string(),
                namespace: ns.to_string(),
            });
        }

        tracing::debug!(namespace = %ns, uuid = %uuid, "Entity edge deleted");
        Ok(())
    }
}

// ── Helpers ──────────────────────────────────────────────────────

fn opt_string(opt: &Option<String>) -> String {
    opt.clone().unwrap_or_default()
}
