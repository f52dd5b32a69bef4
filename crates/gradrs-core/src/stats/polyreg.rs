use crate::error::{FitError, FitResult};

use nalgebra::{DMatrix, DVector};
use std::fmt;

/// Ordinary least squares polynomial `a0 + a1·x + ... + ad·x^d` over one
/// scalar input. Coefficients are stored lowest power first.
#[derive(Clone, Debug)]
pub struct PolyReg {
    pub coeffs: Vec<f64>,
}

impl fmt::Display for PolyReg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "PolyReg(degree {})", self.degree())
    }
}

impl PolyReg {
    pub fn from_coeffs(coeffs: Vec<f64>) -> Self {
        Self { coeffs }
    }

    pub fn degree(&self) -> usize {
        self.coeffs.len().saturating_sub(1)
    }

    /// Horner evaluation.
    pub fn calculate(&self, x: f64) -> f64 {
        self.coeffs.iter().rev().fold(0.0, |acc, &a| acc * x + a)
    }

    pub fn train(x: &[f64], y: &[f64], degree: usize) -> FitResult<Self> {
        if x.len() != y.len() {
            return Err(FitError::LengthMismatch { len_x: x.len(), len_y: y.len() });
        }
        let n_coeffs = degree + 1;
        if x.len() < n_coeffs.max(2) {
            return Err(FitError::NotEnoughPoints { len: x.len(), needed: n_coeffs.max(2) });
        }
        if x.iter().chain(y).any(|v| !v.is_finite()) {
            return Err(FitError::NonFinite("polynomial input"));
        }

        // columns [1, x, x², ..., x^d]
        let vandermonde = DMatrix::from_fn(x.len(), n_coeffs, |i, j| x[i].powi(j as i32));
        let vt = vandermonde.transpose();
        let a = &vt * &vandermonde;
        let b = &vt * DVector::from_column_slice(y);

        let solution = a
            .lu()
            .solve(&b)
            .ok_or(FitError::SingularMatrix("polynomial normal equations"))?;
        if solution.iter().any(|v| !v.is_finite()) {
            return Err(FitError::NonFinite("polynomial coefficients"));
        }

        Ok(Self { coeffs: solution.iter().copied().collect() })
    }
}
