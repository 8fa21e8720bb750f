use crate::pkce::url_safe_token;

/// Raw entropy behind a state token (256 bits).
pub const STATE_BYTES: usize = 32;

/// Generates an opaque, URL-safe anti-CSRF state token.
pub fn generate_state() -> String {
    url_safe_token::<STATE_BYTES>()
}

/// Shortens a state for log lines.
pub fn state_prefix(state: &str) -> &str {
    state.get(..8).unwrap_or(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn states_are_url_safe_and_unique() {
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let state = generate_state();
            assert_eq!(state.len(), 43);
            assert!(state
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
            assert!(seen.insert(state), "state repeated");
        }
    }

    #[test]
    fn prefix_handles_short_values() {
        assert_eq!(state_prefix("abcdefghijk"), "abcdefgh");
        assert_eq!(state_prefix("abc"), "abc");
    }
}
