//! Tolerant structural equality for parsed documents.
//!
//! Values go through unit conversion and decimal formatting on their way
//! through a generator, so a reparsed document can differ from the original
//! in the last bits of its real numbers. [`ApproxEq`] compares documents
//! field by field: real numbers within [`ULPS`] units in the last place,
//! everything else (strings, epochs, enumerations, comments, presence of
//! optional fields, list lengths) exactly.
//!
//! Containers implement the trait through `approx_struct!`, which
//! destructures the struct: leaving a field out of its list does not compile.

use indexmap::IndexMap;

/// Tolerance on real numbers, in units in the last place.
pub const ULPS: u64 = 3;

/// Field-by-field equality with a small tolerance on real numbers.
pub trait ApproxEq {
    fn approx_eq(&self, other: &Self) -> bool;
}

/// Whether two reals are within [`ULPS`] representable values of each other.
///
/// # Examples
///
/// ```rust
/// use ccsds_ndm::approx::close;
///
/// assert!(close(0.1 + 0.2, 0.3));
/// assert!(!close(1.0, 1.0001));
/// assert!(close(f64::NAN, f64::NAN));
/// ```
pub fn close(a: f64, b: f64) -> bool {
    if a.is_nan() || b.is_nan() {
        return a.is_nan() && b.is_nan();
    }
    if a == b {
        return true;
    }
    if a.is_sign_negative() != b.is_sign_negative() {
        return false;
    }
    let (x, y) = (a.to_bits(), b.to_bits());
    x.abs_diff(y) <= ULPS
}

impl ApproxEq for f64 {
    fn approx_eq(&self, other: &Self) -> bool {
        close(*self, *other)
    }
}

macro_rules! approx_exact {
    ($($t:ty),* $(,)?) => {
        $(
            impl ApproxEq for $t {
                fn approx_eq(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

approx_exact!(String, bool, i32, i64, u32, u64, usize, crate::time::Epoch);

impl<T: ApproxEq> ApproxEq for Option<T> {
    fn approx_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.approx_eq(b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: ApproxEq> ApproxEq for Vec<T> {
    fn approx_eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.approx_eq(b))
    }
}

impl<T: ApproxEq, const N: usize> ApproxEq for [T; N] {
    fn approx_eq(&self, other: &Self) -> bool {
        self.iter().zip(other).all(|(a, b)| a.approx_eq(b))
    }
}

impl<V: ApproxEq> ApproxEq for IndexMap<String, V> {
    fn approx_eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .zip(other)
                .all(|((ka, va), (kb, vb))| ka == kb && va.approx_eq(vb))
    }
}

/// Implements [`ApproxEq`] for a struct by comparing the listed fields.
///
/// The struct is destructured without `..`, so the list must name every field.
macro_rules! approx_struct {
    ($t:ty { $($field:ident),* $(,)? }) => {
        impl $crate::approx::ApproxEq for $t {
            fn approx_eq(&self, other: &Self) -> bool {
                let Self { $($field),* } = self;
                true $( && $crate::approx::ApproxEq::approx_eq($field, &other.$field) )*
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_ulps() {
        let x = 6655.9942_f64;
        let next = f64::from_bits(x.to_bits() + 3);
        let far = f64::from_bits(x.to_bits() + 4);
        assert!(close(x, next));
        assert!(!close(x, far));
        assert!(close(0.0, -0.0));
        assert!(!close(1e-300, -1e-300));
    }

    #[derive(Debug)]
    struct Sample {
        name: String,
        value: f64,
    }

    approx_struct!(Sample { name, value });

    #[test]
    fn test_struct_fields_are_all_compared() {
        let a = Sample { name: "A".to_string(), value: 1.0 };
        let b = Sample { name: "A".to_string(), value: f64::from_bits(1.0_f64.to_bits() + 1) };
        let c = Sample { name: "B".to_string(), value: 1.0 };
        assert!(a.approx_eq(&b));
        assert!(!a.approx_eq(&c));
    }

    #[test]
    fn test_options_and_vectors() {
        assert!(Some(1.0).approx_eq(&Some(1.0)));
        assert!(!Some(1.0).approx_eq(&None));
        assert!(vec![1.0, 2.0].approx_eq(&vec![1.0, 2.0]));
        assert!(!vec![1.0].approx_eq(&vec![1.0, 2.0]));
    }
}
