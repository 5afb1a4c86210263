//! Element trait machinery and little-endian wire encoding.
//!
//! Every [`DataType`] has exactly one Rust element type implementing
//! [`Element`]. The trait carries the per-operator combine function and
//! identity, so an incompatible operator/type pair is detected once when an
//! operation is built and never inside an algorithm round.

use crate::error::{CollectiveError, Result};
use crate::types::{DataType, ReduceOp};

/// Binary combine function for one element type.
pub type CombineFn<T> = fn(T, T) -> T;

/// A value that can travel through a collective.
pub trait Element: Copy + PartialEq + Send + Sync + std::fmt::Debug + 'static {
    /// The type descriptor this Rust type maps to.
    const DTYPE: DataType;

    /// Decode one element from exactly `DTYPE.size_in_bytes()` bytes.
    fn read_le(bytes: &[u8]) -> Self;

    /// Encode one element into exactly `DTYPE.size_in_bytes()` bytes.
    fn write_le(self, out: &mut [u8]);

    /// The combine function for `op`, or `None` if `op` is undefined for this
    /// type.
    fn combiner(op: ReduceOp) -> Option<CombineFn<Self>>;

    /// The identity element for `op`, or `None` if `op` is undefined for this
    /// type.
    fn identity(op: ReduceOp) -> Option<Self>;
}

macro_rules! impl_element {
    (int: $($ty:ty => $dtype:ident),*) => {
        $(
            impl Element for $ty {
                const DTYPE: DataType = DataType::$dtype;

                #[inline]
                fn read_le(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(raw)
                }

                #[inline]
                fn write_le(self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_le_bytes());
                }

                fn combiner(op: ReduceOp) -> Option<CombineFn<Self>> {
                    let f: CombineFn<Self> = match op {
                        ReduceOp::Sum => |a: $ty, b: $ty| a.wrapping_add(b),
                        ReduceOp::Prod => |a: $ty, b: $ty| a.wrapping_mul(b),
                        ReduceOp::Min => |a: $ty, b: $ty| a.min(b),
                        ReduceOp::Max => |a: $ty, b: $ty| a.max(b),
                        ReduceOp::And | ReduceOp::Or => return None,
                    };
                    Some(f)
                }

                fn identity(op: ReduceOp) -> Option<Self> {
                    match op {
                        ReduceOp::Sum => Some(0),
                        ReduceOp::Prod => Some(1),
                        ReduceOp::Min => Some(<$ty>::MAX),
                        ReduceOp::Max => Some(<$ty>::MIN),
                        ReduceOp::And | ReduceOp::Or => None,
                    }
                }
            }
        )*
    };
    (float: $($ty:ty => $dtype:ident),*) => {
        $(
            impl Element for $ty {
                const DTYPE: DataType = DataType::$dtype;

                #[inline]
                fn read_le(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(raw)
                }

                #[inline]
                fn write_le(self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_le_bytes());
                }

                fn combiner(op: ReduceOp) -> Option<CombineFn<Self>> {
                    let f: CombineFn<Self> = match op {
                        ReduceOp::Sum => |a: $ty, b: $ty| a + b,
                        ReduceOp::Prod => |a: $ty, b: $ty| a * b,
                        ReduceOp::Min => |a: $ty, b: $ty| a.min(b),
                        ReduceOp::Max => |a: $ty, b: $ty| a.max(b),
                        ReduceOp::And | ReduceOp::Or => return None,
                    };
                    Some(f)
                }

                fn identity(op: ReduceOp) -> Option<Self> {
                    match op {
                        // -0.0 + x == x for every x, including -0.0.
                        ReduceOp::Sum => Some(-0.0),
                        ReduceOp::Prod => Some(1.0),
                        ReduceOp::Min => Some(<$ty>::INFINITY),
                        ReduceOp::Max => Some(<$ty>::NEG_INFINITY),
                        ReduceOp::And | ReduceOp::Or => None,
                    }
                }
            }
        )*
    };
}

impl_element!(int: i32 => Int, i16 => Int16, i64 => Long);
impl_element!(float: f32 => Float, f64 => Double);

impl Element for bool {
    const DTYPE: DataType = DataType::Bool;

    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }

    #[inline]
    fn write_le(self, out: &mut [u8]) {
        out[0] = u8::from(self);
    }

    fn combiner(op: ReduceOp) -> Option<CombineFn<Self>> {
        let f: CombineFn<Self> = match op {
            ReduceOp::And => |a: bool, b: bool| a && b,
            ReduceOp::Or => |a: bool, b: bool| a || b,
            ReduceOp::Sum | ReduceOp::Prod | ReduceOp::Min | ReduceOp::Max => return None,
        };
        Some(f)
    }

    fn identity(op: ReduceOp) -> Option<Self> {
        match op {
            ReduceOp::And => Some(true),
            ReduceOp::Or => Some(false),
            ReduceOp::Sum | ReduceOp::Prod | ReduceOp::Min | ReduceOp::Max => None,
        }
    }
}

/// Encode a typed slice into its wire representation.
pub fn encode<T: Element>(values: &[T]) -> Vec<u8> {
    let width = T::DTYPE.size_in_bytes();
    let mut out = vec![0u8; values.len() * width];
    for (chunk, v) in out.chunks_exact_mut(width).zip(values) {
        v.write_le(chunk);
    }
    out
}

/// Decode a wire buffer into typed elements.
///
/// Fails if `bytes` is not a whole number of elements.
pub fn decode<T: Element>(bytes: &[u8]) -> Result<Vec<T>> {
    let width = T::DTYPE.size_in_bytes();
    if bytes.len() % width != 0 {
        return Err(CollectiveError::transport(format!(
            "{} bytes is not a whole number of {} elements",
            bytes.len(),
            T::DTYPE
        )));
    }
    Ok(bytes.chunks_exact(width).map(T::read_le).collect())
}
