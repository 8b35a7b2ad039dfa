//! Domain-scoped secret substitution into outgoing action parameters
//! (spec §4.7 "Sensitive data").
//!
//! Distinct from `l6-privacy`: that crate redacts PII flowing *out* to
//! events/screenshots, this substitutes real secret values *in* to action
//! parameters before execution — the opposite direction, so it is not
//! layered on top of `l6-privacy` and is kept as its own small module,
//! sharing only `domain_policy::url_host_matches` for pattern matching.

use std::collections::HashMap;

use action_controller::Action;

/// `{domain_pattern -> {key -> secret}}` (spec §4.7).
pub type SensitiveDataMap = HashMap<String, HashMap<String, String>>;

/// Secrets are referenced in action text as `{{key}}`.
fn substitute(text: &str, secrets: &HashMap<String, String>) -> String {
    let mut out = text.to_string();
    for (key, value) in secrets {
        out = out.replace(&format!("{{{{{key}}}}}"), value);
    }
    out
}

/// Replaces `{{key}}` placeholders in `action`'s text fields with the
/// secret value for any domain pattern in `map` that matches `current_url`.
/// Non-text actions and unmatched placeholders pass through unchanged.
pub fn substitute_into_action(action: &Action, current_url: &str, map: &SensitiveDataMap) -> Action {
    let mut resolved = HashMap::new();
    for (pattern, secrets) in map {
        if domain_policy::url_host_matches(current_url, pattern) {
            resolved.extend(secrets.clone());
        }
    }
    if resolved.is_empty() {
        return action.clone();
    }

    match action {
        Action::TypeText { index, text } => Action::TypeText {
            index: *index,
            text: substitute(text, &resolved),
        },
        Action::ExtractStructuredData { query, links } => Action::ExtractStructuredData {
            query: substitute(query, &resolved),
            links: *links,
        },
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_secret_only_for_matching_domain() {
        let mut map = SensitiveDataMap::new();
        let mut secrets = HashMap::new();
        secrets.insert("password".to_string(), "hunter2".to_string());
        map.insert("*.example.com".to_string(), secrets);

        let action = Action::TypeText {
            index: 1,
            text: "{{password}}".to_string(),
        };

        let matched = substitute_into_action(&action, "https://login.example.com", &map);
        match matched {
            Action::TypeText { text, .. } => assert_eq!(text, "hunter2"),
            _ => panic!("wrong variant"),
        }

        let unmatched = substitute_into_action(&action, "https://other.test", &map);
        match unmatched {
            Action::TypeText { text, .. } => assert_eq!(text, "{{password}}"),
            _ => panic!("wrong variant"),
        }
    }
}
