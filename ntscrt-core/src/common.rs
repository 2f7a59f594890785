//! Traits shared across the signal pipeline.

use serde::{Deserialize, Serialize};

/// Reset kind.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResetKind {
    /// Restore user-facing defaults, keep signal history.
    #[default]
    Soft,
    /// Clear everything, including signal history and filter state.
    Hard,
}

/// Trait for stateful pipeline components that can be reset.
pub trait Reset {
    fn reset(&mut self, kind: ResetKind);
}
