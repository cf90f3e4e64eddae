//! Radix-2 Cooley-Tukey FFT over [`Complex64`].
//!
//! Direct port of the algorithm in `FFT.cpp`: split into even/odd
//! halves, recurse, then combine bin `k` of the half-size outputs with
//! twiddle factor `e^{-2*pi*i*k/N}`. Power-of-two sizes only.

use crate::complex::Complex64;
use crate::error::FingerprintError;

const TAU: f64 = std::f64::consts::TAU;

/// Returns `true` if `n` is a power of two (and nonzero).
pub fn is_power_of_two(n: usize) -> bool {
    n > 0 && (n & (n - 1)) == 0
}

/// Returns the smallest power of two `>= n`.
pub fn next_power_of_two(n: usize) -> usize {
    let mut p = 1usize;
    while p < n {
        p *= 2;
    }
    p
}

/// Computes the forward DFT of `data` in place.
///
/// `data.len()` must be a power of two, or [`FingerprintError::InvalidInput`]
/// is returned and `data` is left untouched.
pub fn forward(data: &mut [Complex64]) -> Result<(), FingerprintError> {
    if !is_power_of_two(data.len()) {
        return Err(FingerprintError::InvalidInput(format!(
            "FFT size must be a power of two, got {}",
            data.len()
        )));
    }
    fft_recursive(data);
    Ok(())
}

fn fft_recursive(data: &mut [Complex64]) {
    let n = data.len();
    if n <= 1 {
        return;
    }

    let mut even: Vec<Complex64> = Vec::with_capacity(n / 2);
    let mut odd: Vec<Complex64> = Vec::with_capacity(n / 2);
    for (i, &sample) in data.iter().enumerate() {
        if i % 2 == 0 {
            even.push(sample);
        } else {
            odd.push(sample);
        }
    }

    fft_recursive(&mut even);
    fft_recursive(&mut odd);

    for k in 0..n / 2 {
        let angle = -TAU * k as f64 / n as f64;
        let twiddle = Complex64::from_polar(1.0, angle) * odd[k];
        data[k] = even[k] + twiddle;
        data[k + n / 2] = even[k] - twiddle;
    }
}
