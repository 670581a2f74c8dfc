//! Arithmetics helpers

pub use smooth_operator::{checked, Error};

/// Performs subtraction that returns `None` instead of wrapping around on
/// underflow.
pub trait CheckedSub: Sized + Copy {
    /// Subtracts two numbers, checking for underflow. If underflow happens,
    /// `None` is returned.
    fn checked_sub(&self, rhs: Self) -> Option<Self>;
}

impl CheckedSub for u64 {
    fn checked_sub(&self, rhs: Self) -> Option<Self> {
        u64::checked_sub(*self, rhs)
    }
}

/// Performs addition that returns `None` instead of wrapping around on
/// overflow.
pub trait CheckedAdd: Sized + Copy {
    /// Adds two numbers, checking for overflow. If overflow happens, `None` is
    /// returned.
    fn checked_add(&self, rhs: Self) -> Option<Self>;
}

impl CheckedAdd for u64 {
    fn checked_add(&self, rhs: Self) -> Option<Self> {
        u64::checked_add(*self, rhs)
    }
}
