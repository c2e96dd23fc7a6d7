use std::collections::VecDeque;

use tracing::debug;

use crate::error::Result;
use crate::math::DVector;

/// Sufficient-decrease constant for the Armijo backtracking line search.
const ARMIJO_C1: f64 = 1e-4;

/// Curvature floor below which an (s, y) pair is discarded as unreliable.
const CURVATURE_FLOOR: f64 = 1e-12;

/// Configuration forwarded verbatim to the minimizer.
#[derive(Debug, Clone, Copy)]
pub struct OptimizerOptions {
    /// Maximum number of outer iterations.
    pub max_iterations: usize,
    /// Convergence threshold on the gradient infinity norm.
    pub gradient_tolerance: f64,
    /// Convergence threshold on the relative energy decrease per step.
    pub energy_tolerance: f64,
    /// Number of curvature pairs kept for the limited-memory update.
    pub memory: usize,
    /// Maximum number of backtracking halvings per line search.
    pub max_line_search_steps: usize,
}

impl Default for OptimizerOptions {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            gradient_tolerance: 1e-8,
            energy_tolerance: 1e-12,
            memory: 8,
            max_line_search_steps: 40,
        }
    }
}

/// Outcome of a minimization run.
#[derive(Debug, Clone)]
pub struct OptimizeResult {
    /// Final coordinate vector.
    pub x: DVector,
    /// Final objective value.
    pub energy: f64,
    /// Whether a convergence criterion was met before the iteration cap.
    pub converged: bool,
    /// Outer iterations performed.
    pub iterations: usize,
    /// Objective evaluations performed.
    pub n_evaluations: usize,
    /// Gradient evaluations performed.
    pub n_gradient_evaluations: usize,
}

/// An objective with an analytic gradient.
///
/// Both operations may mutate captured state (the mesh is written on every
/// trial), and both may fail; failures unwind through the minimizer
/// unchanged. [`gradient`](Objective::gradient) is always called at the
/// point of the immediately preceding [`value`](Objective::value) call.
pub trait Objective {
    /// Objective value at `x`.
    ///
    /// # Errors
    ///
    /// Implementation-defined; errors abort the minimization.
    fn value(&mut self, x: &DVector) -> Result<f64>;

    /// Gradient at `x`.
    ///
    /// # Errors
    ///
    /// Implementation-defined; errors abort the minimization.
    fn gradient(&mut self, x: &DVector) -> Result<DVector>;
}

/// Minimizes the objective with limited-memory BFGS and an Armijo
/// backtracking line search.
///
/// The two-loop recursion builds the search direction from the last
/// `memory` curvature pairs; a failed line search falls back to steepest
/// descent once before giving up with `converged = false`.
///
/// # Errors
///
/// Propagates any error returned by the objective or gradient unchanged.
pub fn minimize<O: Objective>(
    problem: &mut O,
    x0: DVector,
    options: &OptimizerOptions,
) -> Result<OptimizeResult> {
    let mut x = x0;
    if x.is_empty() {
        return Ok(OptimizeResult {
            energy: problem.value(&x)?,
            x,
            converged: true,
            iterations: 0,
            n_evaluations: 1,
            n_gradient_evaluations: 0,
        });
    }

    let mut fx = problem.value(&x)?;
    let mut grad = problem.gradient(&x)?;
    let mut n_evaluations = 1;
    let mut n_gradient_evaluations = 1;

    // (s, y, 1/s·y) curvature pairs, oldest first.
    let mut history: VecDeque<(DVector, DVector, f64)> = VecDeque::new();

    for iteration in 0..options.max_iterations {
        if grad.amax() < options.gradient_tolerance {
            debug!(iteration, energy = fx, "gradient converged");
            return Ok(OptimizeResult {
                x,
                energy: fx,
                converged: true,
                iterations: iteration,
                n_evaluations,
                n_gradient_evaluations,
            });
        }

        let mut direction = search_direction(&grad, &history);
        let mut dir_deriv = direction.dot(&grad);
        if dir_deriv >= 0.0 {
            // The curvature history turned the direction uphill; discard it.
            history.clear();
            direction = -&grad;
            dir_deriv = direction.dot(&grad);
        }

        // Backtracking line search with sufficient decrease.
        let mut step = if history.is_empty() {
            (1.0 / grad.norm()).min(1.0)
        } else {
            1.0
        };
        let mut accepted = None;
        for _ in 0..options.max_line_search_steps {
            let candidate = &x + &direction * step;
            let f_new = problem.value(&candidate)?;
            n_evaluations += 1;
            if f_new <= fx + ARMIJO_C1 * step * dir_deriv {
                accepted = Some((candidate, f_new));
                break;
            }
            step *= 0.5;
        }
        let Some((x_new, f_new)) = accepted else {
            if history.is_empty() {
                debug!(iteration, energy = fx, "line search failed along steepest descent");
                return Ok(OptimizeResult {
                    x,
                    energy: fx,
                    converged: false,
                    iterations: iteration,
                    n_evaluations,
                    n_gradient_evaluations,
                });
            }
            // Retry this iteration as plain steepest descent.
            history.clear();
            continue;
        };

        let grad_new = problem.gradient(&x_new)?;
        n_gradient_evaluations += 1;

        let s = &x_new - &x;
        let y = &grad_new - &grad;
        let sy = s.dot(&y);
        if sy > CURVATURE_FLOOR {
            if history.len() == options.memory {
                history.pop_front();
            }
            history.push_back((s, y, 1.0 / sy));
        }

        let decrease = fx - f_new;
        let scale = fx.abs().max(f_new.abs()).max(1.0);
        x = x_new;
        fx = f_new;
        grad = grad_new;

        if decrease.abs() <= options.energy_tolerance * scale {
            debug!(iteration, energy = fx, "energy converged");
            return Ok(OptimizeResult {
                x,
                energy: fx,
                converged: true,
                iterations: iteration + 1,
                n_evaluations,
                n_gradient_evaluations,
            });
        }
    }

    Ok(OptimizeResult {
        x,
        energy: fx,
        converged: false,
        iterations: options.max_iterations,
        n_evaluations,
        n_gradient_evaluations,
    })
}

/// Two-loop recursion: applies the implicit inverse-Hessian estimate to the
/// negated gradient.
fn search_direction(grad: &DVector, history: &VecDeque<(DVector, DVector, f64)>) -> DVector {
    if history.is_empty() {
        return -grad;
    }
    let mut q = grad.clone();
    let mut alphas = Vec::with_capacity(history.len());
    for (s, y, rho) in history.iter().rev() {
        let alpha = rho * s.dot(&q);
        q -= y * alpha;
        alphas.push(alpha);
    }
    if let Some((s, y, _)) = history.back() {
        let yy = y.dot(y);
        if yy > 0.0 {
            q *= s.dot(y) / yy;
        }
    }
    for ((s, y, rho), alpha) in history.iter().zip(alphas.into_iter().rev()) {
        let beta = rho * y.dot(&q);
        q += s * (alpha - beta);
    }
    -q
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// `f(x) = Σ c_i (x_i - t_i)²` with per-axis curvatures.
    struct Quadratic {
        curvatures: Vec<f64>,
        targets: Vec<f64>,
    }

    impl Objective for Quadratic {
        fn value(&mut self, x: &DVector) -> Result<f64> {
            Ok(x.iter()
                .zip(&self.curvatures)
                .zip(&self.targets)
                .map(|((xi, c), t)| c * (xi - t) * (xi - t))
                .sum())
        }

        fn gradient(&mut self, x: &DVector) -> Result<DVector> {
            let g: Vec<f64> = x
                .iter()
                .zip(&self.curvatures)
                .zip(&self.targets)
                .map(|((xi, c), t)| 2.0 * c * (xi - t))
                .collect();
            Ok(DVector::from_vec(g))
        }
    }

    #[test]
    fn quadratic_converges_to_its_minimum() {
        let mut problem = Quadratic {
            curvatures: vec![1.0, 10.0, 0.5],
            targets: vec![3.0, -1.0, 7.0],
        };
        let x0 = DVector::from_vec(vec![0.0, 0.0, 0.0]);
        let options = OptimizerOptions {
            gradient_tolerance: 1e-10,
            energy_tolerance: 0.0,
            ..OptimizerOptions::default()
        };
        let result = minimize(&mut problem, x0, &options).unwrap();

        assert!(result.converged);
        assert!((result.x[0] - 3.0).abs() < 1e-6, "x0 = {}", result.x[0]);
        assert!((result.x[1] + 1.0).abs() < 1e-6, "x1 = {}", result.x[1]);
        assert!((result.x[2] - 7.0).abs() < 1e-6, "x2 = {}", result.x[2]);
        assert!(result.energy < 1e-10);
        assert!(result.n_evaluations >= result.iterations);
    }

    #[test]
    fn iteration_cap_reports_non_convergence() {
        let mut problem = Quadratic {
            curvatures: vec![1.0, 1000.0],
            targets: vec![5.0, 5.0],
        };
        let x0 = DVector::from_vec(vec![-40.0, 40.0]);
        let options = OptimizerOptions {
            max_iterations: 1,
            gradient_tolerance: 1e-14,
            energy_tolerance: 0.0,
            ..OptimizerOptions::default()
        };
        let result = minimize(&mut problem, x0, &options).unwrap();
        assert!(!result.converged);
        assert_eq!(result.iterations, 1);
    }

    #[test]
    fn empty_problem_is_trivially_converged() {
        let mut problem = Quadratic {
            curvatures: vec![],
            targets: vec![],
        };
        let result =
            minimize(&mut problem, DVector::zeros(0), &OptimizerOptions::default()).unwrap();
        assert!(result.converged);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn objective_errors_abort_the_run() {
        struct Failing;
        impl Objective for Failing {
            fn value(&mut self, _: &DVector) -> Result<f64> {
                Err(crate::error::MeshError::EntityNotFound("vertex").into())
            }
            fn gradient(&mut self, _: &DVector) -> Result<DVector> {
                Ok(DVector::zeros(1))
            }
        }
        let result = minimize(&mut Failing, DVector::zeros(1), &OptimizerOptions::default());
        assert!(result.is_err());
    }

    #[test]
    fn rosenbrock_valley_is_tractable() {
        struct Rosenbrock;
        impl Objective for Rosenbrock {
            fn value(&mut self, x: &DVector) -> Result<f64> {
                let (a, b) = (x[0], x[1]);
                Ok((1.0 - a).powi(2) + 100.0 * (b - a * a).powi(2))
            }
            fn gradient(&mut self, x: &DVector) -> Result<DVector> {
                let (a, b) = (x[0], x[1]);
                Ok(DVector::from_vec(vec![
                    -2.0 * (1.0 - a) - 400.0 * a * (b - a * a),
                    200.0 * (b - a * a),
                ]))
            }
        }
        let options = OptimizerOptions {
            max_iterations: 2000,
            gradient_tolerance: 1e-7,
            energy_tolerance: 0.0,
            ..OptimizerOptions::default()
        };
        let result = minimize(&mut Rosenbrock, DVector::from_vec(vec![-1.2, 1.0]), &options)
            .unwrap();
        assert!(result.converged, "iterations = {}", result.iterations);
        assert!((result.x[0] - 1.0).abs() < 1e-4);
        assert!((result.x[1] - 1.0).abs() < 1e-4);
    }
}
