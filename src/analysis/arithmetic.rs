//! Iteration arithmetic.
//!
//! Builds symbolic expressions from a valid [`LoopDescriptor`]. Nothing is
//! folded or evaluated: every operand is parenthesized and the backend
//! receives a residual expression to finish. A `+=`/`-=` step is folded in as
//! a subtraction (ascending) or addition (descending) rather than a division.
//!
//! ```text
//! trip count      (check) - (init)        ascending
//!                 (init) - (check)        descending
//!                 + 1 / - 1               inclusive bound
//!                 - (step) / + (step)     explicit step
//! value at flat   (init) +/- (flat)       unit step
//!                 (init) +/- ((step) * (flat))
//! ```
//!
//! The inputs are only read. Every node in the result is freshly built and
//! carries the span of the iterator's declaration.

use crate::analysis::loop_shape::{Direction, LoopDescriptor};
use crate::frontend::ast::{BinaryOp, Expr};
use crate::utils::location::Span;

impl<'a> LoopDescriptor<'a> {
    /// Symbolic number of iterations.
    ///
    /// # Panics
    ///
    /// If the descriptor is not valid or the iterator has no initializer.
    pub fn trip_count(&self) -> Expr {
        let (init, check, direction) = self.synthesis_inputs("trip_count");
        let span = self.iterator_span();
        let ascending = direction == Direction::Ascending;

        let delta = if ascending {
            combine(BinaryOp::Sub, check, init, span)
        } else {
            combine(BinaryOp::Sub, init, check, span)
        };

        let count = if self.check_is_inclusive() {
            let op = if ascending { BinaryOp::Add } else { BinaryOp::Sub };
            combine(op, &delta, &Expr::int_lit(1, span), span)
        } else {
            delta
        };

        match self.update_value() {
            Some(step) => {
                let op = if ascending { BinaryOp::Sub } else { BinaryOp::Add };
                combine(op, &count, step, span)
            }
            None => count,
        }
    }

    /// The iterator's value at position `flat_index` of the flattened
    /// iteration space.
    ///
    /// # Panics
    ///
    /// If the descriptor is not valid or the iterator has no initializer.
    pub fn value_at_flat_index(&self, flat_index: &Expr) -> Expr {
        let (init, _, direction) = self.synthesis_inputs("value_at_flat_index");
        let span = self.iterator_span();

        let scaled = match self.update_value() {
            Some(step) => combine(BinaryOp::Mul, step, flat_index, span).wrap_in_parentheses(),
            None => flat_index.wrap_in_parentheses(),
        };

        let op = match direction {
            Direction::Ascending => BinaryOp::Add,
            Direction::Descending => BinaryOp::Sub,
        };
        Expr::binary(op, init.wrap_in_parentheses(), scaled, span)
    }

    fn synthesis_inputs(&self, operation: &str) -> (&'a Expr, &'a Expr, Direction) {
        assert!(self.is_valid(), "{} requires a valid loop descriptor", operation);
        let init = match self.init_value() {
            Some(init) => init,
            None => panic!("{} requires an iterator with an initial value", operation),
        };
        match (self.check_value(), self.direction()) {
            (Some(check), Some(direction)) => (init, check, direction),
            _ => panic!("valid descriptor is missing its check value or direction"),
        }
    }
}

/// `(left) op (right)`
fn combine(op: BinaryOp, left: &Expr, right: &Expr, span: Span) -> Expr {
    Expr::binary(op, left.wrap_in_parentheses(), right.wrap_in_parentheses(), span)
}
