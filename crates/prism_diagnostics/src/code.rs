//! Diagnostic codes with category prefixes for structured identification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The category of a diagnostic code, determining its prefix letter.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Category {
    /// Error diagnostics, prefixed with `E`.
    Error,
    /// Warning diagnostics, prefixed with `W`.
    Warning,
}

impl Category {
    /// Returns the single-character prefix for this category.
    pub fn prefix(self) -> char {
        match self {
            Category::Error => 'E',
            Category::Warning => 'W',
        }
    }
}

/// A structured diagnostic code combining a category prefix and a number.
///
/// Displayed as the category prefix followed by a zero-padded 3-digit number,
/// e.g. `W101`, `E202`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct DiagnosticCode {
    /// The category of this diagnostic.
    pub category: Category,
    /// The numeric identifier within the category.
    pub number: u16,
}

impl DiagnosticCode {
    /// An identity was already bound to a different content hash; it was reassigned.
    pub const DUPLICATE_IDENTITY: DiagnosticCode = DiagnosticCode::new(Category::Warning, 101);
    /// A persisted cache line could not be parsed and was skipped.
    pub const MALFORMED_CACHE_LINE: DiagnosticCode = DiagnosticCode::new(Category::Warning, 102);
    /// A root carried more than one identity marker.
    pub const MULTIPLE_IDENTITY_MARKERS: DiagnosticCode =
        DiagnosticCode::new(Category::Warning, 103);
    /// An identity marker's state could not be read; it was treated as unassigned.
    pub const UNREADABLE_IDENTITY_MARKER: DiagnosticCode = DiagnosticCode::new(Category::Warning, 104);
    /// Stripping a duplicate hit a dependency cycle; the candidate was skipped.
    pub const DEPENDENCY_CYCLE_ON_STRIP: DiagnosticCode = DiagnosticCode::new(Category::Error, 201);
    /// Writing an artifact failed; the candidate was skipped.
    pub const ARTIFACT_WRITE_FAILURE: DiagnosticCode = DiagnosticCode::new(Category::Error, 202);

    /// Creates a new diagnostic code.
    pub const fn new(category: Category, number: u16) -> Self {
        Self { category, number }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}", self.category.prefix(), self.number)
    }
}
