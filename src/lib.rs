//! # devloop - device loop validation for kernel languages
//!
//! Checks the parallel loops of `@kernel` functions before backend code
//! generation:
//! - `@outer`/`@inner` nesting rules per kernel
//! - the header shape of every attributed `for` loop
//! - symbolic trip counts and flat-index to iterator mappings
//!
//! ## Architecture
//!
//! ```text
//! Source → Frontend → AST → LoopClassifier → LoopValidator → LoopDescriptor → trip count / flat index
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use devloop::prelude::*;
//!
//! let source = r#"
//!     @kernel void addVectors(int N, float *a, float *b, float *ab) {
//!         for (int i = 0; i < N; ++i; @outer) {
//!             for (int j = 0; j < 16; ++j; @inner) {
//!                 ab[i] = a[i] + b[i];
//!             }
//!         }
//!     }
//! "#;
//!
//! let report = devloop::check_source(source, &CheckConfig::default())?;
//! assert!(report.ok);
//! println!("{}", report.loops[0].trip_count); // (N) - (0)
//! ```

#![warn(clippy::all)]

pub mod frontend;
pub mod analysis;
pub mod utils;

// Re-export commonly used types
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::frontend::{parse, ParseError};
    pub use crate::frontend::ast::*;
    pub use crate::frontend::semantic::{VarId, VarTable};
    pub use crate::analysis::*;
    pub use crate::utils::diagnostics::*;
    pub use crate::utils::errors::*;
    pub use crate::utils::pretty::PrettyPrint;
    pub use crate::{CheckConfig, CheckMode, CheckReport};
}

use crate::analysis::{LoopClassifier, LoopSummary};
use crate::frontend::ast::{Expr, Program};
use crate::utils::diagnostics::{Diagnostic, DiagnosticBag};
use crate::utils::errors::LoopError;
use crate::utils::intern::Symbol;
use crate::utils::location::Span;
use anyhow::Result;
use log::info;
use serde::Serialize;

/// Main entry point for parsing source code.
pub fn parse(source: &str) -> Result<Program> {
    frontend::parse(source)
}

/// How far checking continues after the first malformed loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum CheckMode {
    /// Stop at the first error
    #[default]
    FailFast,
    /// Keep going through sibling loops and kernels
    Batch,
}

/// Configuration for loop checking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckConfig {
    /// Emit diagnostics for rejected loops
    pub print_errors: bool,
    pub mode: CheckMode,
    /// Prepended to every message as `[label] ` when non-empty
    pub source_label: String,
    /// Name of the backend's flat index in synthesized expressions
    pub flat_index_name: String,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            print_errors: true,
            mode: CheckMode::FailFast,
            source_label: String::new(),
            flat_index_name: "flat_idx".to_string(),
        }
    }
}

impl CheckConfig {
    pub fn with_print_errors(mut self, print_errors: bool) -> Self {
        self.print_errors = print_errors;
        self
    }

    pub fn with_mode(mut self, mode: CheckMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_source_label(mut self, label: impl Into<String>) -> Self {
        self.source_label = label.into();
        self
    }

    pub fn with_flat_index_name(mut self, name: impl Into<String>) -> Self {
        self.flat_index_name = name.into();
        self
    }
}

/// Owned result of checking a whole program.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub ok: bool,
    pub loops: Vec<LoopSummary>,
    pub errors: Vec<LoopError>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Classify every kernel of `program` and summarize the well-formed loops.
///
/// The flat index is declared in the program's variable table as an
/// external `int`.
pub fn check_program(program: &mut Program, config: &CheckConfig) -> CheckReport {
    let flat = program.vars.declare_implicit(Symbol::intern(&config.flat_index_name), Span::dummy());
    let flat_index = Expr::var(flat, Span::dummy());

    let mut bag = DiagnosticBag::new();
    let classification = LoopClassifier::new(&program.vars, &mut bag, config).check_program(program);
    let loops: Vec<LoopSummary> = classification.loops.iter().map(|l| l.summary(&flat_index)).collect();
    info!("{} loops accepted, {} rejected", loops.len(), classification.errors.len());

    CheckReport {
        ok: classification.ok,
        loops,
        errors: classification.errors,
        diagnostics: bag.into_vec(),
    }
}

/// Parse `source` and check it.
pub fn check_source(source: &str, config: &CheckConfig) -> Result<CheckReport> {
    let mut program = parse(source)?;
    Ok(check_program(&mut program, config))
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
