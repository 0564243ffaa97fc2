//! Structured JSON responses for every gateway operation.
//!
//! Success responses always name the namespace they ran against. Errors are
//! rendered as `{status: "error", kind, error, namespace?, ...context}` where
//! the context carries whatever the caller needs to fix the request.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};

use graphgate_core::error::Result;
use graphgate_core::types::SearchHit;
use graphgate_core::validate::{
    MAX_NEW_NAMESPACE_LEN, MIN_NEW_NAMESPACE_LEN, NEW_NAMESPACE_ALLOWED, RESERVED_NAMES,
    TENANT_ALLOWED,
};
use graphgate_core::{EpisodeRecord, ErrorKind, GatewayError, IdentifierRule, SourceKind};

use crate::registry::NamespaceSummary;

const NAMING_EXAMPLES: [&str; 3] = ["ai-research", "personal-notes", "work-projects"];
const LIST_HINT: &str = "Call list-namespaces to see all available namespaces with descriptions";

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// Advice returned with every listing.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Guidance {
    pub reuse: &'static str,
    pub naming: &'static str,
    pub create: &'static str,
}

impl Default for Guidance {
    fn default() -> Self {
        Self {
            reuse: "Always use existing namespaces when content matches the description",
            naming: "Use lowercase with hyphens (e.g., 'ai-research', not 'AI Research')",
            create: "Only create new namespaces for distinctly different domains",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ListNamespacesResponse {
    pub status: Status,
    pub namespaces: Vec<NamespaceSummary>,
    pub count: usize,
    pub guidance: Guidance,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ListNamespacesResponse {
    pub fn new(namespaces: Vec<NamespaceSummary>) -> Self {
        let message = namespaces
            .is_empty()
            .then(|| "No namespaces exist yet. Create one with create-namespace.".to_string());
        Self {
            status: Status::Success,
            count: namespaces.len(),
            namespaces,
            guidance: Guidance::default(),
            message,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateNamespaceResponse {
    pub status: Status,
    pub id: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub message: String,
    pub usage: String,
    pub note: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddEpisodeResponse {
    pub status: Status,
    pub namespace_used: String,
    pub name: String,
    pub uuid: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub status: Status,
    pub namespace_searched: String,
    pub query: String,
    pub results: Vec<SearchHit>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GetEpisodesResponse {
    pub status: Status,
    pub namespace: String,
    pub episodes: Vec<EpisodeRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteEntityEdgeResponse {
    pub status: Status,
    pub namespace: String,
    pub uuid: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub status: Status,
    pub kind: ErrorKind,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(flatten)]
    pub context: Map<String, Value>,
}

impl From<&GatewayError> for ErrorResponse {
    fn from(err: &GatewayError) -> Self {
        let mut context = Map::new();
        let mut put = |key: &str, value: Value| {
            context.insert(key.to_string(), value);
        };

        match err {
            GatewayError::InvalidIdentifier { value, rule } => {
                put("value", json!(value));
                match rule {
                    IdentifierRule::Empty | IdentifierRule::TenantCharset => {
                        put("allowed", json!(TENANT_ALLOWED));
                    }
                    IdentifierRule::Uuid => {
                        put("expected_format", json!("xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx"));
                    }
                    IdentifierRule::NewNamespaceCharset => {
                        put("allowed", json!(NEW_NAMESPACE_ALLOWED));
                        put("examples", json!(NAMING_EXAMPLES));
                    }
                    IdentifierRule::NewNamespaceLength { len } => {
                        put("provided_length", json!(len));
                        put(
                            "allowed_length",
                            json!({"min": MIN_NEW_NAMESPACE_LEN, "max": MAX_NEW_NAMESPACE_LEN}),
                        );
                    }
                    IdentifierRule::Reserved => put("reserved_names", json!(RESERVED_NAMES)),
                }
            }
            GatewayError::UnknownNamespace {
                namespace,
                available,
            } => {
                put(
                    "suggestion",
                    json!(format!(
                        "Create it first with create-namespace id='{namespace}'"
                    )),
                );
                put("available_namespaces", json!(available));
                put("hint", json!(LIST_HINT));
            }
            GatewayError::AlreadyExists { namespace } => {
                put(
                    "suggestion",
                    json!(format!(
                        "Use namespace='{namespace}' in add-episode and other operations"
                    )),
                );
                put("tip", json!(LIST_HINT));
            }
            GatewayError::InvalidSourceKind { .. } => {
                put("valid_sources", json!(SourceKind::names()));
            }
            GatewayError::InvalidArgument { field, .. } => put("field", json!(field)),
            GatewayError::NotFound { id, .. } => put("id", json!(id)),
            GatewayError::BackendUnavailable { .. } | GatewayError::Unhandled { .. } => {}
        }

        Self {
            status: Status::Error,
            kind: err.kind(),
            error: err.to_string(),
            namespace: err.namespace().map(str::to_string),
            context,
        }
    }
}

/// Render an operation outcome as the JSON document returned to callers.
pub fn render<T: Serialize>(result: &Result<T>) -> Value {
    let rendered = match result {
        Ok(body) => serde_json::to_value(body),
        Err(err) => serde_json::to_value(ErrorResponse::from(err)),
    };
    rendered.unwrap_or_else(|e| {
        json!({
            "status": Status::Error,
            "kind": ErrorKind::Unhandled,
            "error": format!("could not serialize response: {e}"),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_err(err: GatewayError) -> Value {
        render::<()>(&Err(err))
    }

    #[test]
    fn unknown_namespace_lists_alternatives() {
        let v = render_err(GatewayError::UnknownNamespace {
            namespace: "ghost".to_string(),
            available: vec!["personal".to_string(), "work".to_string()],
        });
        assert_eq!(v["status"], "error");
        assert_eq!(v["kind"], "unknown_namespace");
        assert_eq!(v["namespace"], "ghost");
        assert_eq!(v["available_namespaces"], json!(["personal", "work"]));
        assert!(v["suggestion"].as_str().unwrap().contains("create-namespace"));
    }

    #[test]
    fn creation_rule_context() {
        let v = render_err(GatewayError::invalid_identifier(
            "a",
            IdentifierRule::NewNamespaceLength { len: 1 },
        ));
        assert_eq!(v["kind"], "invalid_identifier");
        assert_eq!(v["provided_length"], 1);
        assert!(v.get("namespace").is_none());

        let v = render_err(GatewayError::invalid_identifier(
            "root",
            IdentifierRule::Reserved,
        ));
        assert_eq!(v["reserved_names"], json!(["default", "system", "admin", "root"]));

        let v = render_err(GatewayError::invalid_identifier(
            "AI Research",
            IdentifierRule::NewNamespaceCharset,
        ));
        assert_eq!(v["examples"], json!(NAMING_EXAMPLES));
    }

    #[test]
    fn invalid_source_lists_valid_sources() {
        let v = render_err(GatewayError::InvalidSourceKind {
            namespace: None,
            value: "unsupported".to_string(),
        });
        assert_eq!(v["valid_sources"], json!(["text", "message", "json"]));
    }

    #[test]
    fn empty_listing_carries_message() {
        let v = render(&Ok(ListNamespacesResponse::new(Vec::new())));
        assert_eq!(v["count"], 0);
        assert!(v["message"].is_string());
        assert!(v["guidance"]["naming"].is_string());

        let v = render(&Ok(ListNamespacesResponse::new(vec![
            NamespaceSummary::Unavailable {
                id: "work".to_string(),
                error: "boom".to_string(),
            },
        ])));
        assert!(v.get("message").is_none());
        assert_eq!(v["namespaces"][0], json!({"id": "work", "error": "boom"}));
    }
}
