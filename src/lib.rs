//! ledgerbridge — idempotent migration of legacy file attachments into
//! ledger records.
//!
//! The pipeline is a chain of flat, append-only CSV streams: inventory
//! discovery feeds the mapping verifier, the verifier feeds the upload
//! orchestrator, and the orchestrator's run log feeds the idempotency
//! index on the next invocation. Correctness rests on log immutability
//! plus the derived in-memory index, not on locks or resume cursors.

use tracing_subscriber::EnvFilter;

pub mod config;
pub mod csvio;
pub mod endpoint;
pub mod ids;
pub mod inventory;
pub mod mapping;
pub mod model;
pub mod report;
pub mod runlog;
pub mod session;
pub mod upload;
pub mod verify;

pub use config::Config;
pub use endpoint::{AttachRequest, AttachmentEndpoint, EndpointResponse, SimulatedEndpoint};
pub use ids::normalize_legacy_id;
pub use model::{
    AttachmentRecord, AttemptOutcome, IdempotencyKey, MappingRecord, RunLogRecord,
    VerificationRecord, VerificationStatus,
};
pub use runlog::IdempotencyIndex;
pub use upload::{run_upload, UploadSummary};
pub use verify::{run_verification, VerificationSummary};

/// Install the tracing subscriber. `LB_LOG` overrides the default `info`
/// filter. Safe to call more than once; later calls are no-ops.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env("LB_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
