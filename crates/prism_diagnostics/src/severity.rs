//! How serious a diagnostic is for the running pass.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Diagnostic severity, least severe first.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// A recovered problem; the pass continued unchanged.
    Warning,
    /// A candidate-level failure; the candidate was skipped.
    Error,
}

impl Severity {
    /// Lowercase name, as used in logs and serialized diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
