//! Raw operation inputs as callers send them.
//!
//! Everything here is untrusted text; the gateway validates it before use.

use serde::Deserialize;

fn default_source() -> String {
    "text".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateNamespaceRequest {
    #[serde(alias = "graph_id")]
    pub id: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddEpisodeRequest {
    pub name: String,
    #[serde(alias = "body")]
    pub episode_body: String,
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default)]
    pub source_description: Option<String>,
    /// ISO-8601; omitted means "now".
    #[serde(default)]
    pub reference_time: Option<String>,
    #[serde(default, alias = "group_id")]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default, alias = "group_id")]
    pub namespace: Option<String>,
    /// Falls back to the configured search limit.
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GetEpisodesRequest {
    #[serde(default, alias = "group_id")]
    pub namespace: Option<String>,
    #[serde(default)]
    pub last_n: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteEntityEdgeRequest {
    pub uuid: String,
    #[serde(default, alias = "group_id")]
    pub namespace: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_episode_defaults() {
        let req: AddEpisodeRequest =
            serde_json::from_str(r#"{"name": "n", "episode_body": "b"}"#).unwrap();
        assert_eq!(req.source, "text");
        assert!(req.namespace.is_none());
        assert!(req.reference_time.is_none());
    }

    #[test]
    fn group_id_is_accepted_for_namespace() {
        let req: SearchRequest =
            serde_json::from_str(r#"{"query": "q", "group_id": "work"}"#).unwrap();
        assert_eq!(req.namespace.as_deref(), Some("work"));
        assert!(req.limit.is_none());
    }
}
