//! Element type bounds shared by every container and expression.

use num_complex::Complex;
use num_traits::Num;

/// Blanket trait for all element types usable in dense and sparse containers.
///
/// The `'static` bound lets the kernel layer select specialized
/// implementations by `TypeId` at monomorphization time.
pub trait Scalar:
    Copy
    + PartialEq
    + std::fmt::Debug
    + num_traits::Zero
    + num_traits::One
    + std::ops::Add<Output = Self>
    + std::ops::Sub<Output = Self>
    + std::ops::Mul<Output = Self>
    + 'static
{
}

impl<T> Scalar for T where
    T: Copy
        + PartialEq
        + std::fmt::Debug
        + num_traits::Zero
        + num_traits::One
        + std::ops::Add<Output = T>
        + std::ops::Sub<Output = T>
        + std::ops::Mul<Output = T>
        + 'static
{
}

/// Complex conjugation, identity for real and integral types.
///
/// Required by the Hermitian adaptor; everything else treats elements as
/// opaque arithmetic values.
pub trait Conjugate: Copy {
    fn conj(self) -> Self;
}

macro_rules! impl_conjugate_real {
    ($($t:ty),*) => {
        $(
            impl Conjugate for $t {
                #[inline(always)]
                fn conj(self) -> Self { self }
            }
        )*
    };
}

impl_conjugate_real!(
    f32, f64, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize
);

impl<T: Num + Copy + Clone + std::ops::Neg<Output = T>> Conjugate for Complex<T> {
    #[inline(always)]
    fn conj(self) -> Self {
        Complex::conj(&self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;

    fn assert_scalar<T: Scalar>() {}

    #[test]
    fn standard_types_are_scalars() {
        assert_scalar::<f32>();
        assert_scalar::<f64>();
        assert_scalar::<i32>();
        assert_scalar::<u64>();
        assert_scalar::<Complex64>();
    }

    #[test]
    fn conjugate_real_is_identity() {
        assert_eq!(3.5_f64.conj(), 3.5);
        assert_eq!(7_i32.conj(), 7);
    }

    #[test]
    fn conjugate_complex_negates_imaginary() {
        let z = Complex64::new(1.0, 2.0);
        assert_eq!(Conjugate::conj(z), Complex64::new(1.0, -2.0));
    }
}
