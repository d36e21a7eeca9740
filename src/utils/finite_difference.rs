//! Finite difference approximations of derivatives.

use crate::error::{Result, XrfFitError};
use crate::problem::Problem;
use ndarray::{Array1, Array2};

/// Default relative step for finite differences.
const DEFAULT_EPSILON: f64 = 1e-7;

/// Jacobian of `problem` at `params` by forward differences.
///
/// The step for parameter `j` is `epsilon * max(|p_j|, 1)`.
pub fn jacobian(problem: &dyn Problem, params: &Array1<f64>, epsilon: Option<f64>) -> Result<Array2<f64>> {
    let eps = epsilon.unwrap_or(DEFAULT_EPSILON);
    let n_params = params.len();
    let n_residuals = problem.residual_count();

    let residuals = problem.eval(params)?;
    if residuals.len() != n_residuals {
        return Err(XrfFitError::DimensionMismatch(format!(
            "Expected {} residuals, got {}",
            n_residuals,
            residuals.len()
        )));
    }

    let mut jac = Array2::zeros((n_residuals, n_params));
    let mut perturbed = params.clone();
    for j in 0..n_params {
        let h = eps * params[j].abs().max(1.0);
        perturbed[j] = params[j] + h;
        let shifted = problem.eval(&perturbed)?;
        perturbed[j] = params[j];

        let column = (&shifted - &residuals) / h;
        jac.column_mut(j).assign(&column);
    }

    Ok(jac)
}
