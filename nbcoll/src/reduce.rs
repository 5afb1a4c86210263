//! Element-wise reduction engine used by the allreduce algorithms.

use crate::element::{CombineFn, Element};
use crate::error::{CollectiveError, Result};
use crate::types::ReduceOp;

/// A reduction operator resolved against one element type.
///
/// Construction is the only place an operator/type mismatch can surface;
/// once built, combining never fails.
#[derive(Clone, Copy)]
pub struct Reducer<T: Element> {
    op: ReduceOp,
    combine: CombineFn<T>,
}

impl<T: Element> Reducer<T> {
    /// Resolve `op` for `T`, failing with a configuration error if the
    /// operator is not defined for the type.
    pub fn new(op: ReduceOp) -> Result<Self> {
        let combine = T::combiner(op).ok_or(CollectiveError::IncompatibleReduceOp {
            op,
            dtype: T::DTYPE,
        })?;
        Ok(Self { op, combine })
    }

    pub fn op(&self) -> ReduceOp {
        self.op
    }

    #[inline]
    pub fn combine(&self, a: T, b: T) -> T {
        (self.combine)(a, b)
    }

    /// `acc[i] = op(acc[i], incoming[i])` for every element.
    ///
    /// Both slices must have the same length.
    pub fn reduce_into(&self, acc: &mut [T], incoming: &[T]) {
        debug_assert_eq!(acc.len(), incoming.len());
        for (a, &b) in acc.iter_mut().zip(incoming) {
            *a = (self.combine)(*a, b);
        }
    }

    /// `acc[i] = op(incoming[i], acc[i])` for every element.
    ///
    /// Used when the incoming data belongs to the lower-ranked side, so both
    /// partners of an exchange combine operands in the same order.
    pub fn reduce_into_rev(&self, acc: &mut [T], incoming: &[T]) {
        debug_assert_eq!(acc.len(), incoming.len());
        for (a, &b) in acc.iter_mut().zip(incoming) {
            *a = (self.combine)(b, *a);
        }
    }
}

impl<T: Element> std::fmt::Debug for Reducer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reducer")
            .field("op", &self.op)
            .field("dtype", &T::DTYPE)
            .finish()
    }
}
