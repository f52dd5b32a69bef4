use crate::error::{FitError, FitResult};

use nalgebra::{DMatrix, DVector};
use std::fmt;

/// Pivots smaller than this are treated as a singular system.
const PIVOT_EPS: f64 = 1e-12;

/// Linear-in-parameters least squares with an L2 penalty, solved from the
/// normal equations `(XᵗX + λI)β = Xᵗy`. The design matrix carries its own
/// bias column if one is wanted; no intercept is added here.
#[derive(Clone, Debug)]
pub struct RidgeReg {
    pub lambda: f64,
    coefficients: Option<DVector<f64>>,
}

impl fmt::Display for RidgeReg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "RidgeReg")
    }
}

impl Default for RidgeReg {
    fn default() -> Self {
        Self::new(0.01)
    }
}

impl RidgeReg {
    pub fn new(lambda: f64) -> Self {
        Self { lambda, coefficients: None }
    }

    pub fn train(x: &DMatrix<f64>, y: &[f64], lambda: f64) -> FitResult<Self> {
        let mut model = Self::new(lambda);
        model.fit(x, y)?;
        Ok(model)
    }

    /// Same as [`RidgeReg::train`] for row-major feature vectors.
    pub fn train_rows(rows: &[Vec<f64>], y: &[f64], lambda: f64) -> FitResult<Self> {
        Self::train(&design_matrix(rows)?, y, lambda)
    }

    pub fn fit(&mut self, x: &DMatrix<f64>, y: &[f64]) -> FitResult<()> {
        let (m, n) = x.shape();
        if m != y.len() {
            return Err(FitError::LengthMismatch { len_x: m, len_y: y.len() });
        }
        if m < 2 {
            return Err(FitError::NotEnoughPoints { len: m, needed: 2 });
        }
        if n == 0 {
            return Err(FitError::FeatureLengthMismatch { got: 0, expected: 1 });
        }
        // without the penalty an underdetermined system is singular
        if self.lambda == 0.0 && m < n {
            return Err(FitError::NotEnoughPoints { len: m, needed: n });
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(FitError::NonFinite("design matrix"));
        }
        if y.iter().any(|v| !v.is_finite()) {
            return Err(FitError::NonFinite("target vector"));
        }

        let xt = x.transpose();
        let mut xtx = &xt * x;
        for i in 0..n {
            xtx[(i, i)] += self.lambda;
        }
        let xty = &xt * DVector::from_column_slice(y);

        self.coefficients = Some(gaussian_elimination(&xtx, &xty)?);
        Ok(())
    }

    pub fn is_trained(&self) -> bool {
        self.coefficients.is_some()
    }

    pub fn coefficients(&self) -> Option<&[f64]> {
        self.coefficients.as_ref().map(|c| c.as_slice())
    }

    pub fn calculate(&self, features: &[f64]) -> FitResult<f64> {
        let coefficients = self.coefficients.as_ref().ok_or(FitError::NotTrained)?;
        if features.len() != coefficients.len() {
            return Err(FitError::FeatureLengthMismatch {
                got: features.len(),
                expected: coefficients.len(),
            });
        }
        Ok(features.iter().zip(coefficients.iter()).map(|(x, b)| x * b).sum())
    }
}

/// Stack row vectors into an `m × n` matrix.
pub fn design_matrix(rows: &[Vec<f64>]) -> FitResult<DMatrix<f64>> {
    let n = rows.first().map_or(0, |r| r.len());
    if let Some(bad) = rows.iter().find(|r| r.len() != n) {
        return Err(FitError::FeatureLengthMismatch { got: bad.len(), expected: n });
    }
    Ok(DMatrix::from_fn(rows.len(), n, |i, j| rows[i][j]))
}

/// Solve `A x = b` by forward elimination with partial pivoting on the
/// augmented matrix `[A | b]`, then back substitution.
pub fn gaussian_elimination(a: &DMatrix<f64>, b: &DVector<f64>) -> FitResult<DVector<f64>> {
    let n = a.nrows();
    if a.ncols() != n || b.len() != n {
        return Err(FitError::LengthMismatch { len_x: a.ncols(), len_y: b.len() });
    }

    let mut aug = DMatrix::<f64>::zeros(n, n + 1);
    aug.view_mut((0, 0), (n, n)).copy_from(a);
    aug.set_column(n, b);

    for i in 0..n {
        let mut max_row = i;
        let mut max_el = aug[(i, i)].abs();
        for k in (i + 1)..n {
            if aug[(k, i)].abs() > max_el {
                max_el = aug[(k, i)].abs();
                max_row = k;
            }
        }

        if !max_el.is_finite() || max_el < PIVOT_EPS {
            return Err(FitError::Singular { column: i, pivot: aug[(max_row, i)] });
        }
        if max_row != i {
            aug.swap_rows(i, max_row);
        }

        for k in (i + 1)..n {
            let c = -aug[(k, i)] / aug[(i, i)];
            aug[(k, i)] = 0.0;
            for j in (i + 1)..=n {
                aug[(k, j)] += c * aug[(i, j)];
            }
        }
    }

    let mut x = DVector::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = aug[(i, n)];
        for j in (i + 1)..n {
            sum -= aug[(i, j)] * x[j];
        }
        x[i] = sum / aug[(i, i)];
    }

    if x.iter().any(|v| !v.is_finite()) {
        return Err(FitError::NonFinite("solution"));
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exactly_determined_matches_ols() {
        // 1 + 2x through (1, 3) and (2, 5)
        let x = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 2.0]);
        let y = [3.0, 5.0];
        let model = RidgeReg::train(&x, &y, 0.0).unwrap();
        let beta = model.coefficients().unwrap();

        let ols = (x.transpose() * &x).lu().solve(&(x.transpose() * DVector::from_row_slice(&y)));
        let ols = ols.unwrap();

        assert!((beta[0] - 1.0).abs() < 1e-9);
        assert!((beta[1] - 2.0).abs() < 1e-9);
        assert!((beta[0] - ols[0]).abs() < 1e-9);
        assert!((beta[1] - ols[1]).abs() < 1e-9);
    }

    #[test]
    fn test_pivoting_handles_zero_leading_entry() {
        let a = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 1.0, 0.0]);
        let b = DVector::from_row_slice(&[2.0, 3.0]);
        let x = gaussian_elimination(&a, &b).unwrap();
        assert!((x[0] - 3.0).abs() < 1e-12);
        assert!((x[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_pivoting_three_by_three() {
        let a = DMatrix::from_row_slice(
            3,
            3,
            &[2.0, 1.0, -1.0, -3.0, -1.0, 2.0, -2.0, 1.0, 2.0],
        );
        let b = DVector::from_row_slice(&[8.0, -11.0, -3.0]);
        let x = gaussian_elimination(&a, &b).unwrap();
        assert!((x[0] - 2.0).abs() < 1e-9);
        assert!((x[1] - 3.0).abs() < 1e-9);
        assert!((x[2] + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_singular_without_ridge() {
        // second column duplicates the first
        let rows = vec![vec![1.0, 1.0], vec![2.0, 2.0], vec![3.0, 3.0]];
        let err = RidgeReg::train_rows(&rows, &[1.0, 2.0, 3.0], 0.0).unwrap_err();
        assert!(matches!(err, FitError::Singular { .. }));
    }

    #[test]
    fn test_ridge_stabilises_collinear_columns() {
        let rows = vec![vec![1.0, 1.0], vec![2.0, 2.0], vec![3.0, 3.0]];
        let model = RidgeReg::train_rows(&rows, &[1.0, 2.0, 3.0], 0.01).unwrap();
        let b = model.coefficients().unwrap();
        assert!(b.iter().all(|v| v.is_finite()));
        // penalty splits the weight evenly between the twin columns
        assert!((b[0] - b[1]).abs() < 1e-9);
        assert!((model.calculate(&[2.0, 2.0]).unwrap() - 2.0).abs() < 1e-2);
    }

    #[test]
    fn test_recovers_quadratic() {
        let xs = [0.0, 0.5, 1.0, 1.5, 2.0, 2.5];
        let rows: Vec<Vec<f64>> = xs.iter().map(|&x| vec![1.0, x, x * x]).collect();
        let y: Vec<f64> = xs.iter().map(|&x| 0.5 - x + 2.0 * x * x).collect();
        let model = RidgeReg::train_rows(&rows, &y, 0.0).unwrap();
        let b = model.coefficients().unwrap();
        assert!((b[0] - 0.5).abs() < 1e-9);
        assert!((b[1] + 1.0).abs() < 1e-9);
        assert!((b[2] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_predict_before_fit() {
        let model = RidgeReg::new(0.01);
        assert_eq!(model.calculate(&[1.0, 2.0]), Err(FitError::NotTrained));
    }

    #[test]
    fn test_not_enough_points() {
        let rows = vec![vec![1.0, 0.5]];
        assert_eq!(
            RidgeReg::train_rows(&rows, &[1.0], 0.01).unwrap_err(),
            FitError::NotEnoughPoints { len: 1, needed: 2 }
        );
    }

    #[test]
    fn test_feature_length_mismatch() {
        let rows = vec![vec![1.0, 0.0], vec![1.0, 1.0], vec![1.0, 2.0]];
        let model = RidgeReg::train_rows(&rows, &[0.0, 1.0, 2.0], 0.0).unwrap();
        assert_eq!(
            model.calculate(&[1.0]),
            Err(FitError::FeatureLengthMismatch { got: 1, expected: 2 })
        );
    }

    #[test]
    fn test_deterministic() {
        let rows: Vec<Vec<f64>> =
            (0..10).map(|i| vec![1.0, i as f64 / 10.0, (i % 3) as f64]).collect();
        let y: Vec<f64> = (0..10).map(|i| (i % 2) as f64).collect();
        let a = RidgeReg::train_rows(&rows, &y, 0.01).unwrap();
        let b = RidgeReg::train_rows(&rows, &y, 0.01).unwrap();
        assert_eq!(a.coefficients(), b.coefficients());
    }
}
