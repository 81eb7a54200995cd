//! Error types for devloop.
//!
//! Lexing and parsing errors abort the frontend. Loop errors are *rejections*:
//! they describe why a loop is not a legal device loop and never abort the
//! compilation.

use thiserror::Error;
use serde::Serialize;
use crate::utils::location::Span;
use std::fmt;

/// Error during lexical analysis.
#[derive(Error, Debug, Clone)]
pub struct LexerError {
    /// The error message
    pub message: String,
    /// Location in source
    pub span: Span,
    /// The kind of lexer error
    pub kind: LexerErrorKind,
}

impl fmt::Display for LexerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.span)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexerErrorKind {
    /// Unexpected character
    UnexpectedChar,
    /// Invalid number literal
    InvalidNumber,
    /// Unterminated block comment
    UnterminatedComment,
}

/// Error during parsing.
#[derive(Error, Debug, Clone)]
pub struct ParseError {
    /// The error message
    pub message: String,
    /// Location in source
    pub span: Span,
    /// The kind of parse error
    pub kind: ParseErrorKind,
    /// What was found
    pub found: Option<String>,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.span)?;
        if let Some(ref found) = self.found {
            write!(f, " (found: {})", found)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Unexpected token
    UnexpectedToken,
    /// Expected an expression
    ExpectedExpression,
    /// Expected a type
    ExpectedType,
    /// Invalid syntax
    InvalidSyntax,
}

/// A rejected device loop, located at the most specific node available.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoopError {
    /// The error message, including the source label prefix if any
    pub message: String,
    /// Location of the offending node
    pub span: Span,
    /// The kind of loop error
    pub kind: LoopErrorKind,
}

impl LoopError {
    pub fn new(kind: LoopErrorKind, message: impl Into<String>, span: Span) -> Self {
        Self { message: message.into(), span, kind }
    }

    /// Coarse category of this rejection.
    pub fn category(&self) -> LoopErrorCategory {
        self.kind.category()
    }
}

impl fmt::Display for LoopError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.span)
    }
}

/// Why a loop was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LoopErrorKind {
    /// `init` is not a declaration statement
    ExpectedDeclaration,
    /// More than one variable declared in `init`
    MultipleIterators,
    /// Iterator declared with a type outside `char`, `short`, `int`
    InvalidIteratorType,
    /// `check` is not an expression statement
    ExpectedCheckExpression,
    /// `check` is not a binary expression
    ExpectedComparison,
    /// `check` operator outside `<`, `<=`, `>=`, `>`
    InvalidCheckOperator,
    /// Neither side of the comparison is the iterator
    CheckMissingIterator,
    /// `update` is not an expression statement
    ExpectedUpdateExpression,
    /// `update` operator outside `++`, `--`, `+=`, `-=`
    InvalidUpdateOperator,
    /// `update` does not step the iterator
    UpdateMissingIterator,
    /// Iterator declared without an initial value
    MissingInitializer,
    /// Kernel without any `@outer` loop
    MissingOuterLoop,
    /// `@outer` loop nest without any `@inner` loop
    MissingInnerLoop,
    /// `@outer` loop nested in an `@inner` loop
    OuterInsideInner,
    /// `@inner` loop not nested in an `@outer` loop
    InnerOutsideOuter,
    /// Arbitrary code between nested attributed loops
    InvalidStatementBetweenLoops,
    /// Loop attribute on something other than a `for` statement
    AttributeOnNonLoop,
    /// Loop body redeclares the iterator's name
    ShadowedIterator,
}

/// The four rejection categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LoopErrorCategory {
    /// Wrong statement kind, wrong nesting, too many iterators
    Structural,
    /// Iterator type outside the permitted set
    Type,
    /// Comparison or step operator outside the accepted sets
    Operator,
    /// Iterator missing from (or shadowed in) a required position
    Identity,
}

impl LoopErrorKind {
    pub fn category(&self) -> LoopErrorCategory {
        use LoopErrorKind::*;
        match self {
            ExpectedDeclaration | MultipleIterators | ExpectedCheckExpression
            | ExpectedComparison | ExpectedUpdateExpression | MissingInitializer
            | MissingOuterLoop | MissingInnerLoop | OuterInsideInner | InnerOutsideOuter
            | InvalidStatementBetweenLoops | AttributeOnNonLoop => LoopErrorCategory::Structural,
            InvalidIteratorType => LoopErrorCategory::Type,
            InvalidCheckOperator | InvalidUpdateOperator => LoopErrorCategory::Operator,
            CheckMissingIterator | UpdateMissingIterator | ShadowedIterator => LoopErrorCategory::Identity,
        }
    }
}
