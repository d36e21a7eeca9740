//! Levenberg-Marquardt optimizer.
//!
//! Damped Gauss-Newton iteration on the internal (unbounded) coordinates of
//! the varying parameters. Each iteration solves
//! `(J^T J + lambda I) dx = -J^T r` by Cholesky decomposition and adapts
//! `lambda` depending on whether the step lowered the cost.

use ndarray::{Array1, Array2};
use std::fmt;
use tracing::{debug, trace};

use crate::elements::FitElementMap;
use crate::energy::EnergyRange;
use crate::error::{Result, XrfFitError};
use crate::model::SpectraModel;
use crate::optimizer::config::LmConfig;
use crate::optimizer::{write_bookkeeping, Optimizer};
use crate::parameters::FitParameters;
use crate::problem::{Problem, SpectrumProblem};
use crate::spectrum::Spectrum;

/// Result of a Levenberg-Marquardt run.
#[derive(Debug, Clone)]
pub struct LmResult {
    /// Parameter vector at the solution
    pub params: Array1<f64>,

    /// Sum of squared residuals at the solution
    pub cost: f64,

    /// Number of accepted steps
    pub iterations: usize,

    /// Number of residual evaluations
    pub func_evals: usize,

    /// Whether a convergence criterion was met
    pub success: bool,

    /// A message describing the result
    pub message: String,
}

impl fmt::Display for LmResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Optimization Result:")?;
        writeln!(f, "  Success: {}", self.success)?;
        writeln!(f, "  Message: {}", self.message)?;
        writeln!(f, "  Cost: {:.6e}", self.cost)?;
        writeln!(f, "  Iterations: {}", self.iterations)?;
        writeln!(f, "  Function evaluations: {}", self.func_evals)?;
        Ok(())
    }
}

/// The Levenberg-Marquardt optimizer.
#[derive(Debug, Clone, Default)]
pub struct LmOptimizer {
    config: LmConfig,
}

impl LmOptimizer {
    /// Create an optimizer with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an optimizer with the given configuration.
    pub fn with_config(config: LmConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LmConfig {
        &self.config
    }

    /// Set the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    /// Set the tolerance for relative change in cost.
    pub fn with_ftol(mut self, ftol: f64) -> Self {
        self.config.ftol = ftol;
        self
    }

    /// Set the tolerance for change in parameter values.
    pub fn with_xtol(mut self, xtol: f64) -> Self {
        self.config.xtol = xtol;
        self
    }

    /// Enable or disable `1 / sqrt(counts)` channel weighting.
    pub fn with_poisson_weights(mut self, enabled: bool) -> Self {
        self.config.poisson_weights = enabled;
        self
    }

    /// Minimize the sum of squared residuals of `problem` from `initial_params`.
    pub fn minimize_problem<P: Problem>(
        &self,
        problem: &P,
        initial_params: Array1<f64>,
    ) -> Result<LmResult> {
        let n_params = problem.parameter_count();
        if initial_params.len() != n_params {
            return Err(XrfFitError::DimensionMismatch(format!(
                "Expected {} parameters, got {}",
                n_params,
                initial_params.len()
            )));
        }

        let mut params = initial_params;
        let mut cost = sum_of_squares(&problem.eval(&params)?);
        let mut func_evals = 1;
        let mut iterations = 0;
        let mut lambda = self.config.initial_lambda;

        let finish = |params: Array1<f64>, cost, iterations, func_evals, success, message: String| {
            Ok(LmResult {
                params,
                cost,
                iterations,
                func_evals,
                success,
                message,
            })
        };

        if n_params == 0 {
            return finish(params, cost, 0, func_evals, true, "No varying parameters".to_string());
        }
        if !cost.is_finite() {
            return Err(XrfFitError::FunctionEvaluation(
                "initial cost is not finite".to_string(),
            ));
        }

        loop {
            if iterations >= self.config.max_iterations {
                let message = format!("Maximum iterations ({}) reached", self.config.max_iterations);
                return finish(params, cost, iterations, func_evals, false, message);
            }

            let residuals = problem.eval(&params)?;
            let jacobian = problem.jacobian(&params)?;
            func_evals += n_params + 2;

            let jt = jacobian.t();
            let jtj = jt.dot(&jacobian);
            let gradient = jt.dot(&residuals);

            let gradient_norm = gradient.dot(&gradient).sqrt();
            if gradient_norm < self.config.gtol {
                let message = format!(
                    "Gradient convergence: ||g|| = {:.2e} < {:.2e}",
                    gradient_norm, self.config.gtol
                );
                return finish(params, cost, iterations, func_evals, true, message);
            }

            // Raise lambda until a step lowers the cost
            loop {
                let step = match solve_damped(&jtj, &gradient, lambda) {
                    Some(step) => step,
                    None => {
                        lambda = (lambda * self.config.lambda_up_factor).min(self.config.max_lambda);
                        if lambda >= self.config.max_lambda {
                            return Err(XrfFitError::OptimizationFailure(
                                "damped normal equations are singular at maximum lambda".to_string(),
                            ));
                        }
                        continue;
                    }
                };

                let trial = &params + &step;
                let trial_cost = sum_of_squares(&problem.eval(&trial)?);
                func_evals += 1;

                if trial_cost < cost {
                    let param_change = step.iter().fold(0.0_f64, |m, x| m.max(x.abs()));
                    let cost_change = (cost - trial_cost) / cost.max(1e-10);

                    params = trial;
                    cost = trial_cost;
                    iterations += 1;
                    lambda = (lambda * self.config.lambda_down_factor).max(self.config.min_lambda);
                    trace!(iterations, cost, lambda, "accepted step");

                    if param_change < self.config.xtol {
                        let message = format!(
                            "Parameter convergence: |dx| = {:.2e} < {:.2e}",
                            param_change, self.config.xtol
                        );
                        return finish(params, cost, iterations, func_evals, true, message);
                    }
                    if cost_change < self.config.ftol {
                        let message = format!(
                            "Cost convergence: |df|/|f| = {:.2e} < {:.2e}",
                            cost_change, self.config.ftol
                        );
                        return finish(params, cost, iterations, func_evals, true, message);
                    }
                    break;
                }

                lambda = (lambda * self.config.lambda_up_factor).min(self.config.max_lambda);
                if lambda >= self.config.max_lambda {
                    // Even short gradient steps fail: stationary within rounding
                    let message = "No step decreases the cost at maximum lambda".to_string();
                    return finish(params, cost, iterations, func_evals, true, message);
                }
            }
        }
    }
}

impl Optimizer for LmOptimizer {
    fn name(&self) -> &str {
        "levenberg-marquardt"
    }

    fn minimize(
        &self,
        params: &mut FitParameters,
        spectrum: &Spectrum,
        elements: &FitElementMap,
        model: &dyn SpectraModel,
        energy_range: EnergyRange,
    ) -> Result<()> {
        let problem = SpectrumProblem::new(
            params,
            spectrum,
            elements,
            model,
            energy_range,
            self.config.poisson_weights,
        )?;

        if problem.parameter_count() == 0 {
            let cost = problem.cost(params)?;
            write_bookkeeping(params, 0, cost);
            return Ok(());
        }

        let result = self.minimize_problem(&problem, params.to_internal_array()?)?;
        debug!(
            success = result.success,
            iterations = result.iterations,
            cost = result.cost,
            message = %result.message,
            "levenberg-marquardt finished"
        );

        params.update_from_internal(&result.params)?;
        write_bookkeeping(params, result.iterations, result.cost);
        Ok(())
    }
}

/// Sum of squares, with NaN mapped to infinity so it never compares as better
fn sum_of_squares(residuals: &Array1<f64>) -> f64 {
    let cost = residuals.dot(residuals);
    if cost.is_nan() {
        f64::INFINITY
    } else {
        cost
    }
}

/// Solve `(jtj + lambda I) dx = -gradient` by Cholesky decomposition.
///
/// Returns `None` when the damped matrix is not positive definite or the
/// step is not finite.
fn solve_damped(jtj: &Array2<f64>, gradient: &Array1<f64>, lambda: f64) -> Option<Array1<f64>> {
    let n = jtj.nrows();
    let mut l = jtj.clone();
    for i in 0..n {
        l[[i, i]] += lambda;
    }

    // In-place lower Cholesky factor
    for k in 0..n {
        for j in 0..k {
            l[[k, k]] -= l[[k, j]] * l[[k, j]];
        }
        if l[[k, k]].is_nan() || l[[k, k]] <= 0.0 {
            return None;
        }
        let diag = l[[k, k]].sqrt();
        l[[k, k]] = diag;
        for i in (k + 1)..n {
            for j in 0..k {
                l[[i, k]] -= l[[i, j]] * l[[k, j]];
            }
            l[[i, k]] /= diag;
        }
    }

    // L y = -g
    let mut y = gradient.mapv(|g| -g);
    for i in 0..n {
        for j in 0..i {
            y[i] -= l[[i, j]] * y[j];
        }
        y[i] /= l[[i, i]];
    }

    // L^T x = y
    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let mut value = y[i];
        for j in (i + 1)..n {
            value -= l[[j, i]] * x[j];
        }
        x[i] = value / l[[i, i]];
    }

    x.iter().all(|v: &f64| v.is_finite()).then_some(x)
}
