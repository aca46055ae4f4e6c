//! The remote attachment endpoint as a swappable capability.
//!
//! The orchestrator only ever sees [`AttachmentEndpoint`], so the
//! simulated implementation here and a future real HTTP client are
//! interchangeable. Expected conditions — a missing file, an injected
//! fault — come back as response values, never as errors or panics; the
//! caller handles failure as data.

use std::path::Path;
use std::time::Instant;

use rand::rngs::ThreadRng;
use rand::Rng;

use crate::config::{Config, LatencyBounds};
use crate::ids::new_remote_id;
use crate::session::SessionHandle;

/// One attachment upload request. Borrowed from the verification record
/// driving the attempt.
#[derive(Debug, Clone, Copy)]
pub struct AttachRequest<'a> {
    pub entity_type: &'a str,
    pub entity_id: &'a str,
    pub file_name: &'a str,
    pub file_path: &'a Path,
}

/// Structured endpoint response. `status_code < 400` means success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointResponse {
    pub status_code: u16,
    pub remote_id: Option<String>,
    pub error_message: Option<String>,
    pub duration_ms: u64,
}

impl EndpointResponse {
    pub fn is_success(&self) -> bool {
        self.status_code < 400
    }
}

pub trait AttachmentEndpoint {
    fn attach(&mut self, request: &AttachRequest<'_>) -> EndpointResponse;
}

/// Stand-in for the real ledger API: validates file existence, sleeps for
/// a bounded random duration, and injects failures at a configured rate.
pub struct SimulatedEndpoint {
    fail_rate: f64,
    latency: LatencyBounds,
    #[allow(dead_code)]
    session: SessionHandle,
    tenant_id: String,
    rng: ThreadRng,
}

impl SimulatedEndpoint {
    pub fn new(config: &Config, session: SessionHandle, tenant_id: String) -> Self {
        Self {
            fail_rate: config.fail_rate,
            latency: config.latency,
            session,
            tenant_id,
            rng: rand::rng(),
        }
    }
}

impl AttachmentEndpoint for SimulatedEndpoint {
    fn attach(&mut self, request: &AttachRequest<'_>) -> EndpointResponse {
        let start = Instant::now();

        if !request.file_path.is_file() {
            // Deterministic not-found; no latency simulation beyond the
            // minimal baseline of the check itself.
            return EndpointResponse {
                status_code: 404,
                remote_id: None,
                error_message: Some(format!(
                    "file not found: {}",
                    request.file_path.display()
                )),
                duration_ms: start.elapsed().as_millis() as u64,
            };
        }

        if self.latency.max_ms > 0 {
            let delay = self
                .rng
                .random_range(self.latency.min_ms..=self.latency.max_ms);
            std::thread::sleep(std::time::Duration::from_millis(delay));
        }

        if self.rng.random::<f64>() < self.fail_rate {
            return EndpointResponse {
                status_code: 500,
                remote_id: None,
                error_message: Some(format!(
                    "synthetic API failure attaching {} to {} {} (tenant {})",
                    request.file_name, request.entity_type, request.entity_id, self.tenant_id
                )),
                duration_ms: start.elapsed().as_millis() as u64,
            };
        }

        EndpointResponse {
            status_code: 200,
            remote_id: Some(new_remote_id()),
            error_message: None,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::acquire_session;
    use std::collections::BTreeSet;

    fn test_config(dir: &Path, fail_rate: f64) -> Config {
        Config {
            data_dir: dir.join("data"),
            files_dir: dir.join("files"),
            log_dir: dir.join("logs"),
            excluded_types: BTreeSet::new(),
            fail_rate,
            latency: LatencyBounds {
                min_ms: 0,
                max_ms: 0,
            },
        }
    }

    fn endpoint(dir: &Path, fail_rate: f64) -> SimulatedEndpoint {
        let (session, tenant) = acquire_session();
        SimulatedEndpoint::new(&test_config(dir, fail_rate), session, tenant)
    }

    #[test]
    fn missing_file_is_a_deterministic_404() {
        let dir = tempfile::tempdir().unwrap();
        let mut ep = endpoint(dir.path(), 0.0);
        let missing = dir.path().join("nope.pdf");
        let resp = ep.attach(&AttachRequest {
            entity_type: "Bill",
            entity_id: "1001",
            file_name: "nope.pdf",
            file_path: &missing,
        });
        assert_eq!(resp.status_code, 404);
        assert!(!resp.is_success());
        assert!(resp.remote_id.is_none());
        assert!(resp.error_message.unwrap().contains("file not found"));
    }

    #[test]
    fn zero_fail_rate_always_succeeds_with_fresh_remote_ids() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("doc.pdf");
        std::fs::write(&file, b"x").unwrap();
        let mut ep = endpoint(dir.path(), 0.0);
        let request = AttachRequest {
            entity_type: "Bill",
            entity_id: "1001",
            file_name: "doc.pdf",
            file_path: &file,
        };
        let first = ep.attach(&request);
        let second = ep.attach(&request);
        assert_eq!(first.status_code, 200);
        assert_eq!(second.status_code, 200);
        assert_ne!(first.remote_id, second.remote_id);
    }

    #[test]
    fn full_fail_rate_always_fails_with_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("doc.pdf");
        std::fs::write(&file, b"x").unwrap();
        let mut ep = endpoint(dir.path(), 1.0);
        for _ in 0..10 {
            let resp = ep.attach(&AttachRequest {
                entity_type: "Bill",
                entity_id: "1001",
                file_name: "doc.pdf",
                file_path: &file,
            });
            assert_eq!(resp.status_code, 500);
            assert!(resp.error_message.is_some());
        }
    }
}
