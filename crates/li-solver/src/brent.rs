//! Bracketed Brent root solver with downward bracket expansion.

use crate::error::{SolverError, SolverResult};
use tracing::{debug, trace};

/// Brent solver configuration.
///
/// Tolerance and iteration cap are solver-internal policy; callers get the
/// defaults unless they have a reason not to.
#[derive(Clone, Copy, Debug)]
pub struct BrentConfig {
    /// Maximum Brent iterations
    pub max_iterations: usize,
    /// Absolute tolerance on the root
    pub tol: f64,
    /// Relative machine precision used in the convergence test
    pub machine_eps: f64,
    /// Step by which the lower bound is pushed down while searching for a
    /// sign change
    pub bracket_step: f64,
    /// Maximum number of bracket expansions
    pub max_bracket_tries: usize,
}

impl Default for BrentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            tol: 1e-6,
            machine_eps: 3e-8,
            bracket_step: 10.0,
            max_bracket_tries: 5,
        }
    }
}

/// Brent iteration result.
#[derive(Clone, Copy, Debug)]
pub struct BrentResult {
    /// Converged root
    pub root: f64,
    /// Residual at the root
    pub residual: f64,
    /// Number of iterations used
    pub iterations: usize,
}

/// Find a root of `f` in `[lower, upper]`.
///
/// The upper bound is fixed; if `f` has the same sign at both ends the lower
/// bound is pushed down by `bracket_step` up to `max_bracket_tries` times
/// before giving up. This matches how the melt step searches for a surface
/// temperature below freezing: the upper bracket is pinned at 0 C and the
/// lower bracket starts just below the previous surface temperature.
pub fn root_brent<F>(lower: f64, upper: f64, f: F, config: &BrentConfig) -> SolverResult<BrentResult>
where
    F: Fn(f64) -> f64,
{
    let mut a = lower;
    let b0 = upper;

    let mut fa = eval(&f, a)?;
    let fb0 = eval(&f, b0)?;

    // Expand the lower bound until the bracket straddles a sign change.
    let mut tries = 0;
    while fa * fb0 > 0.0 {
        if tries >= config.max_bracket_tries {
            return Err(SolverError::BracketFailure {
                lower: a,
                upper: b0,
                f_lower: fa,
                f_upper: fb0,
                tries,
            });
        }
        a -= config.bracket_step;
        fa = eval(&f, a)?;
        tries += 1;
        debug!(lower = a, f_lower = fa, tries, "expanded bracket");
    }

    // Brent's method: inverse quadratic interpolation with a bisection
    // fallback, never leaving the bracket.
    let mut b = b0;
    let mut fb = fb0;
    let mut c = a;
    let mut fc = fa;
    let mut d = b - a;
    let mut e = d;

    for iter in 1..=config.max_iterations {
        if fb * fc > 0.0 {
            c = a;
            fc = fa;
            d = b - a;
            e = d;
        }
        if fc.abs() < fb.abs() {
            a = b;
            b = c;
            c = a;
            fa = fb;
            fb = fc;
            fc = fa;
        }

        let tol1 = 2.0 * config.machine_eps * b.abs() + 0.5 * config.tol;
        let xm = 0.5 * (c - b);

        if xm.abs() <= tol1 || fb == 0.0 {
            debug!(root = b, residual = fb, iterations = iter, "converged");
            return Ok(BrentResult {
                root: b,
                residual: fb,
                iterations: iter,
            });
        }

        if e.abs() >= tol1 && fa.abs() > fb.abs() {
            // Attempt inverse quadratic interpolation
            let s = fb / fa;
            let (mut p, mut q) = if a == c {
                // Secant fallback when only two distinct points exist
                (2.0 * xm * s, 1.0 - s)
            } else {
                let q = fa / fc;
                let r = fb / fc;
                (
                    s * (2.0 * xm * q * (q - r) - (b - a) * (r - 1.0)),
                    (q - 1.0) * (r - 1.0) * (s - 1.0),
                )
            };
            if p > 0.0 {
                q = -q;
            }
            p = p.abs();

            let min1 = 3.0 * xm * q - (tol1 * q).abs();
            let min2 = (e * q).abs();
            if 2.0 * p < min1.min(min2) {
                // Interpolation accepted
                e = d;
                d = p / q;
            } else {
                d = xm;
                e = d;
            }
        } else {
            d = xm;
            e = d;
        }

        a = b;
        fa = fb;
        if d.abs() > tol1 {
            b += d;
        } else {
            b += tol1.copysign(xm);
        }
        fb = eval(&f, b)?;
        trace!(iter, b, fb, "brent step");
    }

    Err(SolverError::ConvergenceFailed {
        iterations: config.max_iterations,
        residual: fb,
    })
}

fn eval<F: Fn(f64) -> f64>(f: &F, x: f64) -> SolverResult<f64> {
    let v = f(x);
    if v.is_finite() {
        Ok(v)
    } else {
        Err(SolverError::NonFiniteResidual { x })
    }
}
