//! Minimal complex-number arithmetic for the FFT.
//!
//! Kept separate from the FFT itself so the transform reads as pure
//! butterfly combination logic, mirroring `NumeroComplejo`/`FFT` being
//! split across two files in the original implementation.

use std::ops::{Add, Mul, Sub};

/// A complex sample with `f64` components, used only inside the FFT.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Complex64 {
    pub re: f64,
    pub im: f64,
}

impl Complex64 {
    pub const fn new(re: f64, im: f64) -> Self {
        Complex64 { re, im }
    }

    pub const fn zero() -> Self {
        Complex64::new(0.0, 0.0)
    }

    pub fn magnitude(&self) -> f64 {
        (self.re * self.re + self.im * self.im).sqrt()
    }

    pub fn phase(&self) -> f64 {
        self.im.atan2(self.re)
    }

    pub fn from_polar(magnitude: f64, angle: f64) -> Self {
        Complex64::new(magnitude * angle.cos(), magnitude * angle.sin())
    }
}

impl Add for Complex64 {
    type Output = Complex64;
    fn add(self, rhs: Self) -> Self {
        Complex64::new(self.re + rhs.re, self.im + rhs.im)
    }
}

impl Sub for Complex64 {
    type Output = Complex64;
    fn sub(self, rhs: Self) -> Self {
        Complex64::new(self.re - rhs.re, self.im - rhs.im)
    }
}

impl Mul for Complex64 {
    type Output = Complex64;
    fn mul(self, rhs: Self) -> Self {
        Complex64::new(
            self.re * rhs.re - self.im * rhs.im,
            self.re * rhs.im + self.im * rhs.re,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magnitude_of_unit_polar() {
        let c = Complex64::from_polar(2.0, 0.0);
        assert!((c.magnitude() - 2.0).abs() < 1e-12);
        assert!((c.re - 2.0).abs() < 1e-12);
        assert!(c.im.abs() < 1e-12);
    }

    #[test]
    fn multiplication_matches_definition() {
        let a = Complex64::new(1.0, 2.0);
        let b = Complex64::new(3.0, -1.0);
        let p = a * b;
        assert!((p.re - 5.0).abs() < 1e-12);
        assert!((p.im - 5.0).abs() < 1e-12);
    }
}
