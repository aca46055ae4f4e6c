//! Demo session acquisition for the target ledger API.
//!
//! A real implementation would run an OAuth flow and return an authorized
//! HTTP session plus the tenant (realm) id. The pipeline treats both as
//! opaque; only the endpoint constructor ever looks inside.

use uuid::Uuid;

/// Opaque session handle handed to the endpoint. Deliberately minimal:
/// the orchestrator never inspects it.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    token: String,
}

impl SessionHandle {
    pub fn token(&self) -> &str {
        &self.token
    }
}

/// Acquire a (fake) session and tenant id. Shaped like the production
/// call so a real OAuth-backed implementation slots in unchanged.
pub fn acquire_session() -> (SessionHandle, String) {
    let session = SessionHandle {
        token: format!("demo-session-{}", Uuid::new_v4().as_simple()),
    };
    let tenant_id = "1234567890".to_string();
    tracing::debug!(
        target: "ledgerbridge",
        event = "session_acquired",
        tenant_id = %tenant_id,
    );
    (session, tenant_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sessions_are_distinct() {
        let (a, _) = acquire_session();
        let (b, _) = acquire_session();
        assert_ne!(a.token(), b.token());
    }
}
