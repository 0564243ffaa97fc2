use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::validate::{
    MAX_NEW_NAMESPACE_LEN, MIN_NEW_NAMESPACE_LEN, NEW_NAMESPACE_ALLOWED, TENANT_ALLOWED,
};

/// Which identifier rule a value broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierRule {
    Empty,
    TenantCharset,
    Uuid,
    NewNamespaceCharset,
    NewNamespaceLength { len: usize },
    Reserved,
}

impl fmt::Display for IdentifierRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("namespace id is required"),
            Self::TenantCharset => write!(f, "must contain only {TENANT_ALLOWED}"),
            Self::Uuid => f.write_str(
                "must be a valid UUID in hyphenated form (xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx)",
            ),
            Self::NewNamespaceCharset => write!(f, "must be {NEW_NAMESPACE_ALLOWED} only"),
            Self::NewNamespaceLength { len } => write!(
                f,
                "must be between {MIN_NEW_NAMESPACE_LEN} and {MAX_NEW_NAMESPACE_LEN} characters (got {len})"
            ),
            Self::Reserved => f.write_str("is a reserved name"),
        }
    }
}

/// Top-level error type for gateway operations.
///
/// Every variant is caller-facing: operations never panic or bubble an
/// untyped error, they render one of these into a structured response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Invalid identifier '{value}': {rule}")]
    InvalidIdentifier { value: String, rule: IdentifierRule },

    #[error("Namespace '{namespace}' does not exist")]
    UnknownNamespace {
        namespace: String,
        available: Vec<String>,
    },

    #[error("Namespace '{namespace}' already exists")]
    AlreadyExists { namespace: String },

    #[error("Graph backend unavailable: {message}")]
    BackendUnavailable {
        namespace: Option<String>,
        message: String,
    },

    #[error("Invalid source type: {value}")]
    InvalidSourceKind {
        namespace: Option<String>,
        value: String,
    },

    #[error("Invalid {field}: {message}")]
    InvalidArgument {
        namespace: Option<String>,
        field: &'static str,
        message: String,
    },

    #[error("{what} '{id}' not found in namespace '{namespace}'")]
    NotFound {
        namespace: String,
        what: &'static str,
        id: String,
    },

    #[error("{message}")]
    Unhandled {
        namespace: Option<String>,
        message: String,
    },
}

/// Machine-readable error category, rendered as the `kind` field.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidIdentifier,
    UnknownNamespace,
    AlreadyExists,
    BackendUnavailable,
    InvalidSourceKind,
    InvalidArgument,
    NotFound,
    Unhandled,
}

impl GatewayError {
    pub fn invalid_identifier(value: &str, rule: IdentifierRule) -> Self {
        Self::InvalidIdentifier {
            value: value.to_string(),
            rule,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidIdentifier { .. } => ErrorKind::InvalidIdentifier,
            Self::UnknownNamespace { .. } => ErrorKind::UnknownNamespace,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::BackendUnavailable { .. } => ErrorKind::BackendUnavailable,
            Self::InvalidSourceKind { .. } => ErrorKind::InvalidSourceKind,
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Unhandled { .. } => ErrorKind::Unhandled,
        }
    }

    /// The namespace this failure is attributed to, if any.
    pub fn namespace(&self) -> Option<&str> {
        match self {
            Self::UnknownNamespace { namespace, .. }
            | Self::AlreadyExists { namespace }
            | Self::NotFound { namespace, .. } => Some(namespace),
            Self::BackendUnavailable { namespace, .. }
            | Self::Unhandled { namespace, .. }
            | Self::InvalidSourceKind { namespace, .. }
            | Self::InvalidArgument { namespace, .. } => namespace.as_deref(),
            Self::InvalidIdentifier { .. } => None,
        }
    }

    /// Attach namespace context to failures that lack it.
    pub fn in_namespace(self, ns: &str) -> Self {
        match self {
            Self::InvalidSourceKind {
                namespace: None,
                value,
            } => Self::InvalidSourceKind {
                namespace: Some(ns.to_string()),
                value,
            },
            Self::InvalidArgument {
                namespace: None,
                field,
                message,
            } => Self::InvalidArgument {
                namespace: Some(ns.to_string()),
                field,
                message,
            },
            Self::BackendUnavailable {
                namespace: None,
                message,
            } => Self::BackendUnavailable {
                namespace: Some(ns.to_string()),
                message,
            },
            Self::Unhandled {
                namespace: None,
                message,
            } => Self::Unhandled {
                namespace: Some(ns.to_string()),
                message,
            },
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
