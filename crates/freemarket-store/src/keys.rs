//! Key builders for every capacity store entry.
//!
//! Deployment-wide prefixes are applied by the Redis client, so the keys
//! here are relative.

/// Hash with one field per registered session token.
pub fn session_registry() -> &'static str {
    "session"
}

/// TTL marker proving that `token` is still alive.
pub fn session_marker(token: &str) -> String {
    format!("session_expire:{token}")
}

/// Operator-configured cap on registered sessions.
pub fn session_limit() -> &'static str {
    "session_limit"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_is_distinct_from_registry() {
        let marker = session_marker("abc");
        assert_eq!(marker, "session_expire:abc");
        assert_ne!(marker, session_registry());
        assert_ne!(session_registry(), session_limit());
    }
}
