//! Manager configuration.

use serde::{Deserialize, Serialize};

/// Behaviour knobs for [`CtmManager`](crate::CtmManager).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Stage an identity transform on the output when a control is
    /// released, evicted or fails, so the next commit drops the old matrix.
    pub clear_on_release: bool,
    /// Apply a freshly received matrix right away when the output is
    /// enabled. When false, the matrix waits for the next commit that
    /// enables the output.
    pub apply_on_set: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            clear_on_release: true,
            apply_on_set: true,
        }
    }
}
