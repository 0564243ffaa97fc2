//! Conversion of backend failures into caller-facing errors.

use graphgate_core::redact::redact_secrets;
use graphgate_core::{GatewayError, NamespaceId};
use graphgate_graph::GraphError;

/// Map a `GraphError` onto the gateway taxonomy, attaching `ns` as context.
///
/// Backend text is redacted here so neither the response nor any log line
/// built from the result carries credentials.
pub fn from_graph(err: GraphError, ns: Option<&NamespaceId>) -> GatewayError {
    let namespace = ns.map(NamespaceId::to_string);
    match err {
        GraphError::Connection(message) => GatewayError::BackendUnavailable {
            namespace,
            message: redact_secrets(&message).into_owned(),
        },
        GraphError::NotFound {
            what,
            id,
            namespace: found_in,
        } => GatewayError::NotFound {
            namespace: found_in,
            what,
            id,
        },
        other => GatewayError::Unhandled {
            namespace,
            message: redact_secrets(&other.to_string()).into_owned(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphgate_core::ErrorKind;

    #[test]
    fn connection_failures_are_backend_unavailable() {
        let ns = NamespaceId::parse("work").unwrap();
        let err = from_graph(
            GraphError::Connection("connection refused".to_string()),
            Some(&ns),
        );
        assert_eq!(err.kind(), ErrorKind::BackendUnavailable);
        assert_eq!(err.namespace(), Some("work"));
    }

    #[test]
    fn other_failures_are_unhandled_and_redacted() {
        let err = from_graph(
            GraphError::Backend("auth failed for sk-abcdefghijklmnopqrstuvwx".to_string()),
            None,
        );
        assert_eq!(err.kind(), ErrorKind::Unhandled);
        let msg = err.to_string();
        assert!(!msg.contains("sk-abcdefghijklmnop"));
        assert!(msg.contains("[REDACTED_OPENAI_KEY]"));
    }

    #[test]
    fn not_found_keeps_its_target() {
        let err = from_graph(
            GraphError::NotFound {
                what: "Entity edge",
                id: "123e4567-e89b-12d3-a456-426614174000".to_string(),
                namespace: "work".to_string(),
            },
            None,
        );
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.namespace(), Some("work"));
    }
}
