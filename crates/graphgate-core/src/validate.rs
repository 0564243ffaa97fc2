//! Identifier validation.
//!
//! Identifiers end up inside backend query text and storage keys, so every
//! grammar here is a whitelist. All checks are pure and run before any
//! network call.

use uuid::Uuid;

use crate::error::{GatewayError, IdentifierRule, Result};

/// Characters accepted by the tenant grammar, as shown to callers.
pub const TENANT_ALLOWED: &str = "alphanumeric characters, hyphens, and underscores";

/// Characters accepted by the creation grammar, as shown to callers.
pub const NEW_NAMESPACE_ALLOWED: &str = "lowercase letters, numbers, and hyphens";

/// Names that cannot be claimed through namespace creation.
pub const RESERVED_NAMES: [&str; 4] = ["default", "system", "admin", "root"];

pub const MIN_NEW_NAMESPACE_LEN: usize = 2;
pub const MAX_NEW_NAMESPACE_LEN: usize = 50;

/// Validate a tenant (namespace) identifier: non-empty, `[A-Za-z0-9_-]+`.
///
/// Returns the input unchanged on success.
pub fn validate_tenant_id(value: &str) -> Result<&str> {
    if value.is_empty() {
        return Err(GatewayError::invalid_identifier(value, IdentifierRule::Empty));
    }

    let ok = value
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if !ok {
        return Err(GatewayError::invalid_identifier(
            value,
            IdentifierRule::TenantCharset,
        ));
    }

    Ok(value)
}

/// Validate an entity identifier as a canonical hyphenated UUID.
///
/// `Uuid::parse_str` also accepts simple, braced, and URN spellings; only
/// the 36-character hyphenated form is allowed through.
pub fn validate_entity_uuid(value: &str) -> Result<&str> {
    let hyphenated = value.len() == 36
        && value
            .char_indices()
            .all(|(i, c)| matches!(i, 8 | 13 | 18 | 23) == (c == '-'));

    if !hyphenated || Uuid::parse_str(value).is_err() {
        return Err(GatewayError::invalid_identifier(value, IdentifierRule::Uuid));
    }

    Ok(value)
}

/// Validate an id for a namespace that is about to be created.
///
/// Narrower than the tenant grammar: lowercase letters, digits, and
/// hyphens only, 2 to 50 characters, and not a reserved name.
pub fn validate_new_namespace_id(value: &str) -> Result<&str> {
    let ok = !value.is_empty()
        && value
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
    if !ok {
        return Err(GatewayError::invalid_identifier(
            value,
            IdentifierRule::NewNamespaceCharset,
        ));
    }

    let len = value.len();
    if !(MIN_NEW_NAMESPACE_LEN..=MAX_NEW_NAMESPACE_LEN).contains(&len) {
        return Err(GatewayError::invalid_identifier(
            value,
            IdentifierRule::NewNamespaceLength { len },
        ));
    }

    if RESERVED_NAMES.contains(&value) {
        return Err(GatewayError::invalid_identifier(
            value,
            IdentifierRule::Reserved,
        ));
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn tenant_grammar_accepts_word_characters() {
        for id in ["personal", "work-projects", "my_notes", "A1", "x", "-_-"] {
            assert_eq!(validate_tenant_id(id).unwrap(), id);
        }
    }

    #[test]
    fn tenant_grammar_rejects_injection_shapes() {
        for id in [
            "",
            "../../../etc/passwd",
            "test@domain",
            "group#1",
            "my group",
            "group/test",
            "a.b",
            "..",
            "tab\there",
            "ünïcode",
        ] {
            let err = validate_tenant_id(id).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidIdentifier, "{id:?}");
        }
    }

    #[test]
    fn tenant_error_names_value_and_allowed_set() {
        let msg = validate_tenant_id("my group").unwrap_err().to_string();
        assert!(msg.contains("my group"));
        assert!(msg.contains(TENANT_ALLOWED));
    }

    #[test]
    fn uuid_grammar() {
        let good = "123e4567-e89b-12d3-a456-426614174000";
        assert_eq!(validate_entity_uuid(good).unwrap(), good);
        assert!(validate_entity_uuid("123E4567-E89B-12D3-A456-426614174000").is_ok());

        for bad in [
            "",
            "not-a-uuid",
            "abc123",
            "123e4567-e89b-XXXX-a456-426614174000",
            "123e4567e89b12d3a456426614174000",
            "{123e4567-e89b-12d3-a456-426614174000}",
            "urn:uuid:123e4567-e89b-12d3-a456-426614174000",
            "123e4567-e89b-12d3-a456-42661417400g",
            "123e4567-e89b-12d3a-456-426614174000",
        ] {
            assert!(validate_entity_uuid(bad).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn creation_grammar_examples() {
        assert!(validate_new_namespace_id("ai-research").is_ok());
        assert!(validate_new_namespace_id("personal-notes-2").is_ok());
        assert!(validate_new_namespace_id("AI Research").is_err());
        assert!(validate_new_namespace_id("my_notes").is_err());
        assert!(validate_new_namespace_id("a").is_err());
        assert!(validate_new_namespace_id(&"a".repeat(50)).is_ok());
        assert!(validate_new_namespace_id(&"a".repeat(51)).is_err());
        for reserved in RESERVED_NAMES {
            assert!(validate_new_namespace_id(reserved).is_err());
        }
    }

    #[test]
    fn creation_errors_name_the_broken_rule() {
        let rule = |id: &str| match validate_new_namespace_id(id).unwrap_err() {
            GatewayError::InvalidIdentifier { rule, .. } => rule,
            other => panic!("unexpected error: {other:?}"),
        };
        assert_eq!(rule("AI Research"), IdentifierRule::NewNamespaceCharset);
        assert_eq!(rule("a"), IdentifierRule::NewNamespaceLength { len: 1 });
        assert_eq!(rule("root"), IdentifierRule::Reserved);
        assert!(validate_new_namespace_id("a")
            .unwrap_err()
            .to_string()
            .contains("got 1"));
    }
}
