//! Secret redaction for log output.
//!
//! Backend error text and connection strings can carry credentials. Anything
//! passed to a log macro that did not originate in this crate goes through
//! [`redact_secrets`] first.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;

pub const REDACTED_OPENAI_KEY: &str = "[REDACTED_OPENAI_KEY]";
pub const REDACTED_TOKEN: &str = "[REDACTED_TOKEN]";
pub const REDACTED: &str = "[REDACTED]";

/// Compiled once on first use.
static PATTERNS: OnceLock<SecretPatterns> = OnceLock::new();

struct SecretPatterns {
    /// `sk-...` and `sk-proj-...` keys, at least 16 characters after `sk-`.
    api_key: Regex,
    bearer: Regex,
    /// `scheme://user:password@` authority prefixes.
    uri_credentials: Regex,
}

impl SecretPatterns {
    fn new() -> Self {
        Self {
            api_key: Regex::new(r"(^|[^A-Za-z0-9_\-])sk-[A-Za-z0-9_\-]{16,}")
                .expect("api_key regex must compile"),
            bearer: Regex::new(r"Bearer [A-Za-z0-9_.~+/=\-]+")
                .expect("bearer regex must compile"),
            uri_credentials: Regex::new(r#"://[^/\s"'@]+@"#)
                .expect("uri_credentials regex must compile"),
        }
    }
}

fn patterns() -> &'static SecretPatterns {
    PATTERNS.get_or_init(SecretPatterns::new)
}

/// Replace API keys, bearer tokens, and URI credentials in `input`.
pub fn redact_secrets(input: &str) -> Cow<'_, str> {
    let p = patterns();
    let rules = [
        (&p.api_key, format!("${{1}}{REDACTED_OPENAI_KEY}")),
        (&p.bearer, format!("Bearer {REDACTED_TOKEN}")),
        (&p.uri_credentials, format!("://{REDACTED}@")),
    ];

    let mut out = Cow::Borrowed(input);
    for (re, replacement) in &rules {
        let replaced = match re.replace_all(&out, replacement.as_str()) {
            Cow::Borrowed(_) => None,
            Cow::Owned(s) => Some(s),
        };
        if let Some(s) = replaced {
            out = Cow::Owned(s);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaves_clean_text_untouched() {
        let msg = "Failed to list graphs: connection refused";
        assert!(matches!(redact_secrets(msg), Cow::Borrowed(_)));
    }

    #[test]
    fn redacts_project_keys() {
        let key = format!("sk-proj-{}", "A1b2_C3d4-".repeat(12));
        let msg = format!("auth failed for key {key} (401)");
        let redacted = redact_secrets(&msg);
        assert!(!redacted.contains("sk-proj-"));
        assert_eq!(redacted, format!("auth failed for key {REDACTED_OPENAI_KEY} (401)"));
    }

    #[test]
    fn short_sk_prefix_is_not_a_key() {
        assert_eq!(redact_secrets("task-sk-1 failed"), "task-sk-1 failed");
    }

    #[test]
    fn redacts_bearer_tokens() {
        let redacted = redact_secrets("Authorization: Bearer abc.def.ghi rejected");
        assert_eq!(
            redacted,
            format!("Authorization: Bearer {REDACTED_TOKEN} rejected")
        );
    }

    #[test]
    fn redacts_uri_credentials() {
        let redacted = redact_secrets("cannot reach bolt://neo4j:hunter2@db:7687/");
        assert_eq!(redacted, format!("cannot reach bolt://{REDACTED}@db:7687/"));
    }

    #[test]
    fn keeps_uri_without_credentials() {
        let msg = "cannot reach bolt://localhost:7687";
        assert_eq!(redact_secrets(msg), msg);
    }
}
