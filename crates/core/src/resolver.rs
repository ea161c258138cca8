//! Active-version resolution rules.
//!
//! Pure selection logic over a version collection: which version is
//! displayed, and which one takes over when the active version is deleted.
//! [`crate::version::Version`] lists are kept ordered by `version_number`
//! ascending; the fallback rule leans on that ordering.

use crate::version::Version;

/// Resolve the version a parent entity currently displays.
///
/// Returns the active non-deleted version when one exists, otherwise the
/// non-deleted version with the lowest `version_number` so the UI never
/// shows a blank artifact while any version exists. Returns `None` when the
/// list is empty or fully deleted.
pub fn resolve<P>(versions: &[Version<P>]) -> Option<&Version<P>> {
    versions
        .iter()
        .find(|v| v.is_active && !v.is_deleted())
        .or_else(|| fallback_active(versions))
}

/// The replacement rule applied when the active version is removed: lowest
/// remaining `version_number` among non-deleted versions.
pub fn fallback_active<P>(versions: &[Version<P>]) -> Option<&Version<P>> {
    versions
        .iter()
        .filter(|v| !v.is_deleted())
        .min_by_key(|v| v.version_number)
}

/// Count of non-deleted versions flagged active. Anything above one is an
/// invariant violation.
pub fn active_count<P>(versions: &[Version<P>]) -> usize {
    versions
        .iter()
        .filter(|v| v.is_active && !v.is_deleted())
        .count()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
