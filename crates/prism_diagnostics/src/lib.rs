//! Structured warnings and errors reported while exporting.
//!
//! Recoverable conditions (a malformed cache line, an identity collision, a
//! candidate that failed to strip) never abort a pass. They are recorded as
//! [`Diagnostic`]s in a [`DiagnosticSink`] and mirrored to `tracing`, so the
//! host can both show them to the user and inspect them in tests.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use severity::Severity;
pub use sink::DiagnosticSink;
