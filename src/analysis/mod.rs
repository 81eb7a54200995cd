//! Device loop analyses.
//!
//! - [`matcher`]: locating the iterator inside expressions
//! - [`loop_shape`]: validating a single `for` header
//! - [`arithmetic`]: trip count and flat-index synthesis
//! - [`classify`]: checking `@outer`/`@inner` nests across kernels

pub mod matcher;
pub mod loop_shape;
pub mod arithmetic;
pub mod classify;

pub use matcher::{IteratorMatcher, IteratorSide};
pub use loop_shape::{Direction, LoopDescriptor, LoopValidator, UpdateOp};
pub use classify::{
    find_shadowing_declaration, find_statements, is_attributed_loop, loop_attribute,
    Classification, ClassifiedLoop, LoopAttribute, LoopClassifier, LoopSummary,
};
