use uuid::Uuid;

/// Fixed prefix the legacy system prepends to transaction identifiers in
/// the source filesystem hierarchy. The mapping export stores ids without
/// it.
pub const LEGACY_ID_PREFIX: &str = "80";

/// Normalize a raw legacy identifier into the canonical form used in every
/// join: trim surrounding whitespace, strip the fixed legacy prefix when
/// present, uppercase the remainder.
///
/// Total and deterministic for any input, including the empty string. An
/// id without the expected prefix passes through otherwise unchanged; the
/// verifier surfaces that as a data-quality flag rather than this function
/// guessing. This is the single point of truth for normalization — no
/// other code builds a normalized id any other way.
pub fn normalize_legacy_id(raw: &str) -> String {
    let trimmed = raw.trim();
    let stripped = trimmed.strip_prefix(LEGACY_ID_PREFIX).unwrap_or(trimmed);
    stripped.to_uppercase()
}

/// Whether a raw id carries the expected legacy prefix. Used by the
/// verifier to flag defect rows; never alters normalization itself.
pub fn has_legacy_prefix(raw: &str) -> bool {
    raw.trim().starts_with(LEGACY_ID_PREFIX)
}

/// Generate a synthetic remote attachment id for the simulated endpoint.
pub fn new_remote_id() -> String {
    format!("rmt-{}", Uuid::now_v7().as_simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_prefix_and_uppercases() {
        assert_eq!(normalize_legacy_id("80abc123"), "ABC123");
        assert_eq!(normalize_legacy_id("80ABC123"), "ABC123");
    }

    #[test]
    fn leaves_unprefixed_ids_alone() {
        assert_eq!(normalize_legacy_id("abc123"), "ABC123");
        assert_eq!(normalize_legacy_id("ABC123"), "ABC123");
    }

    #[test]
    fn trims_whitespace() {
        assert_eq!(normalize_legacy_id("   80xyz789  "), "XYZ789");
        assert_eq!(normalize_legacy_id(" abc "), "ABC");
    }

    #[test]
    fn total_on_degenerate_input() {
        assert_eq!(normalize_legacy_id(""), "");
        assert_eq!(normalize_legacy_id("   "), "");
        assert_eq!(normalize_legacy_id("80"), "");
    }

    #[test]
    fn idempotent_on_its_own_output() {
        for raw in ["80abc123", "abc123", "  80Def456 ", "", "Z9"] {
            let once = normalize_legacy_id(raw);
            assert_eq!(normalize_legacy_id(&once), once);
        }
    }

    #[test]
    fn prefix_detection_matches_policy() {
        assert!(has_legacy_prefix("80abc"));
        assert!(has_legacy_prefix("  80abc "));
        assert!(!has_legacy_prefix("abc"));
    }
}
