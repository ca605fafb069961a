//! Checked arithmetic for slot, epoch and balance bookkeeping.
//!
//! Consensus code must never panic on overflow, so the integer operators are
//! replaced with methods that surface an `ArithError` the caller propagates.

/// Error representing a failed arithmetic operation.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ArithError {
    Overflow,
    DivisionByZero,
}

pub type Result<T> = std::result::Result<T, ArithError>;

/// Provides checked variants of the standard integer operators.
pub trait SafeArith: Sized + Copy {
    const ZERO: Self;
    const ONE: Self;

    fn safe_add(&self, other: Self) -> Result<Self>;

    fn safe_sub(&self, other: Self) -> Result<Self>;

    fn safe_mul(&self, other: Self) -> Result<Self>;

    fn safe_div(&self, other: Self) -> Result<Self>;

    fn safe_rem(&self, other: Self) -> Result<Self>;

    /// Mutate `self` by adding `other`, erroring on overflow.
    fn safe_add_assign(&mut self, other: Self) -> Result<()> {
        *self = self.safe_add(other)?;
        Ok(())
    }

    /// Mutate `self` by subtracting `other`, erroring on underflow.
    fn safe_sub_assign(&mut self, other: Self) -> Result<()> {
        *self = self.safe_sub(other)?;
        Ok(())
    }
}

macro_rules! impl_safe_arith {
    ($typ:ty) => {
        impl SafeArith for $typ {
            const ZERO: Self = 0;
            const ONE: Self = 1;

            fn safe_add(&self, other: Self) -> Result<Self> {
                self.checked_add(other).ok_or(ArithError::Overflow)
            }

            fn safe_sub(&self, other: Self) -> Result<Self> {
                self.checked_sub(other).ok_or(ArithError::Overflow)
            }

            fn safe_mul(&self, other: Self) -> Result<Self> {
                self.checked_mul(other).ok_or(ArithError::Overflow)
            }

            fn safe_div(&self, other: Self) -> Result<Self> {
                self.checked_div(other).ok_or(ArithError::DivisionByZero)
            }

            fn safe_rem(&self, other: Self) -> Result<Self> {
                self.checked_rem(other).ok_or(ArithError::DivisionByZero)
            }
        }
    };
}

impl_safe_arith!(u8);
impl_safe_arith!(u16);
impl_safe_arith!(u32);
impl_safe_arith!(u64);
impl_safe_arith!(usize);
impl_safe_arith!(i64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic() {
        let x = 10u64;
        let y = 11u64;
        assert_eq!(x.safe_add(y), Ok(21));
        assert_eq!(y.safe_sub(x), Ok(1));
        assert_eq!(x.safe_mul(y), Ok(110));
        assert_eq!(y.safe_div(x), Ok(1));
        assert_eq!(y.safe_rem(x), Ok(1));
    }

    #[test]
    fn errors() {
        assert!(u64::max_value().safe_add(1).is_err());
        assert!(0u64.safe_sub(1).is_err());
        assert!(u64::max_value().safe_mul(2).is_err());
        assert!(1u64.safe_div(0).is_err());
        assert!(1u64.safe_rem(0).is_err());
    }

    #[test]
    fn assign() {
        let mut x = 1u64;
        x.safe_add_assign(1).unwrap();
        assert_eq!(x, 2);
        x.safe_sub_assign(1).unwrap();
        assert_eq!(x, 1);
    }
}
