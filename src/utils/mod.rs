//! Utility modules shared by the frontend and the loop analyses.
//!
//! - Error types
//! - Diagnostics and sinks
//! - Source location tracking
//! - Symbol interning
//! - Pretty printing

pub mod errors;
pub mod diagnostics;
pub mod location;
pub mod intern;
pub mod pretty;

// Re-exports
pub use errors::*;
pub use diagnostics::{Diagnostic, DiagnosticBag, DiagnosticSeverity, DiagnosticSink, LogSink, NullSink};
pub use location::{SourceLocation, SourceMap, Span};
pub use intern::Symbol;
pub use pretty::{PrettyPrint, SourcePrinter};
