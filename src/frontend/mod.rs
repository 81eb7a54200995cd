//! Frontend: lexer, parser and AST for the kernel dialect.
//!
//! Kernels are C functions annotated with `@kernel`. Parallel loops carry
//! `@outer`/`@inner` either in the loop header or as a prefix:
//!
//! ```text
//! @kernel void addVectors(int N, float *a, float *b, float *ab) {
//!     for (int i = 0; i < N; i += 16; @outer) {
//!         for (int j = i; j < i + 16; ++j; @inner) {
//!             ab[j] = a[j] + b[j];
//!         }
//!     }
//! }
//! ```
//!
//! Identifiers are resolved while parsing, so every variable reference in the
//! resulting [`Program`] carries the identity of its declaration.

pub mod token;
pub mod lexer;
pub mod ast;
pub mod parser;
pub mod semantic;

// Re-exports
pub use lexer::Lexer;
pub use parser::Parser;
pub use ast::*;
pub use semantic::{VarId, VarTable, Variable};
pub use token::{Token, TokenKind};
pub use crate::utils::errors::ParseError;

use anyhow::Result;

/// Parse source code into an AST.
pub fn parse(source: &str) -> Result<ast::Program> {
    let lexer = Lexer::new(source);
    let parser = Parser::new(lexer)?;
    parser.parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kernel() {
        let source = r#"
            @kernel void addVectors(int N, float *a, float *b, float *ab) {
                for (int i = 0; i < N; i += 16; @outer) {
                    for (int j = i; j < i + 16; ++j; @inner) {
                        if (j < N) ab[j] = a[j] + b[j];
                    }
                }
            }
        "#;
        let program = parse(source).unwrap();
        assert_eq!(program.kernels().count(), 1);
        let outer = &program.functions[0].body.statements[0];
        assert_eq!(outer.attributes[0].name.as_string(), "outer");
    }

    #[test]
    fn test_lexer_error_surfaces() {
        assert!(parse("@kernel void f() { int a = 1 & 2; }").is_err());
    }
}
