
//! Two-dimensional vectors and the rounding rules of resolution levels.

use std::ops::{Add, Mul, Sub};
use crate::error::{i32_to_usize, usize_to_i32, Result};


/// A position or a size, in pixels or in tiles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Vec2<T> (pub T, pub T);

impl<T> Vec2<T> {

    /// Apply the function to both components.
    pub fn map<B>(self, map: impl Fn(T) -> B) -> Vec2<B> {
        Vec2(map(self.0), map(self.1))
    }

    /// The product of both components.
    pub fn area(self) -> T where T: Mul<T, Output = T> {
        self.0 * self.1
    }

    /// The horizontal component.
    #[inline] pub fn x(self) -> T { self.0 }

    /// The vertical component.
    #[inline] pub fn y(self) -> T { self.1 }

    /// The horizontal component of a size.
    #[inline] pub fn width(self) -> T { self.0 }

    /// The vertical component of a size.
    #[inline] pub fn height(self) -> T { self.1 }
}

impl Vec2<i32> {

    /// Fails for negative components.
    pub fn to_usize(self, quantity: &'static str) -> Result<Vec2<usize>> {
        Ok(Vec2(i32_to_usize(self.0, quantity)?, i32_to_usize(self.1, quantity)?))
    }
}

impl Vec2<usize> {

    /// Fails for components that do not fit into an `i32`.
    pub fn to_i32(self, quantity: &'static str) -> Result<Vec2<i32>> {
        Ok(Vec2(usize_to_i32(self.0, quantity)?, usize_to_i32(self.1, quantity)?))
    }
}

macro_rules! componentwise {
    ($trait: ident, $method: ident) => {
        impl<T: $trait<T>> $trait<Vec2<T>> for Vec2<T> {
            type Output = Vec2<T::Output>;

            fn $method(self, other: Vec2<T>) -> Self::Output {
                Vec2(self.0.$method(other.0), self.1.$method(other.1))
            }
        }
    };
}

componentwise!(Add, add);
componentwise!(Sub, sub);
componentwise!(Mul, mul);

impl<T> From<(T, T)> for Vec2<T> {
    fn from((x, y): (T, T)) -> Self { Vec2(x, y) }
}


/// Whether the size of a smaller level is rounded down or up.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum RoundingMode {

    /// Round down.
    Down,

    /// Round up.
    Up,
}

impl RoundingMode {

    /// The base two logarithm, rounded by this mode. Zero for zero.
    pub(crate) fn log2(self, number: usize) -> usize {
        if number <= 1 {
            return 0;
        }

        let floor = (usize::BITS - 1 - number.leading_zeros()) as usize;
        let is_power_of_two = number.is_power_of_two();

        match self {
            RoundingMode::Up if !is_power_of_two => floor + 1,
            _ => floor,
        }
    }

    /// Divide, rounding by this mode. Only for positive numbers.
    pub(crate) fn divide(self, dividend: usize, divisor: usize) -> usize {
        match self {
            RoundingMode::Down => dividend / divisor,
            RoundingMode::Up => dividend.div_ceil(divisor),
        }
    }

    /// Halve a resolution once, never going below one pixel.
    pub(crate) fn halve(self, size: usize) -> usize {
        self.divide(size, 2).max(1)
    }
}
