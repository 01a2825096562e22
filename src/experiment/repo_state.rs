//! Version-control state seen by the dirty-repository guard

use crate::Result;

/// Read-only view of the working tree's version-control state.
///
/// Implementations typically shell out to or link against a VCS; the
/// evaluation pipeline only needs these two answers.
pub trait RepoState {
    /// Whether the working tree has uncommitted changes.
    ///
    /// # Errors
    /// Returns error if the state cannot be determined.
    fn is_dirty(&self) -> Result<bool>;

    /// Identifier of the checked-out revision.
    ///
    /// # Errors
    /// Returns error if the revision cannot be determined.
    fn current_revision_id(&self) -> Result<String>;
}
