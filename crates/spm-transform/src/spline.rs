//! Quintic smoothing splines.
//!
//! The fit is a penalised B-spline: a clamped degree-5 basis on uniformly
//! spaced knots, a third-order difference penalty on the coefficients, and
//! a penalty weight chosen so the residual sum of squares meets the
//! requested smoothing factor. A factor of zero asks for the closest fit the
//! basis allows; larger factors trade fidelity for smoothness.

use tracing::trace;

use crate::error::{Result, TransformError};

/// Degree of the smoothing spline.
pub const SPLINE_DEGREE: usize = 5;

/// Upper bound on interior knots; keeps the dense solve small for long curves.
const MAX_INTERIOR_KNOTS: usize = 60;

const PENALTY_ORDER: usize = 3;

/// Penalty weight search range, relative to the basis/penalty trace ratio.
const RHO_MIN: f64 = 1e-12;
const RHO_MAX: f64 = 1e10;
const SEARCH_STEPS: usize = 60;

/// A spline in B-spline form.
#[derive(Debug, Clone, PartialEq)]
pub struct BSpline {
    knots: Vec<f64>,
    coeffs: Vec<f64>,
    degree: usize,
}

impl BSpline {
    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coeffs
    }

    /// Evaluates the spline; points outside the knot range are clamped to it.
    pub fn eval(&self, x: f64) -> f64 {
        let p = self.degree;
        let n = self.coeffs.len();
        let x = x.clamp(self.knots[p], self.knots[n]);
        let span = find_span(&self.knots, n, p, x);

        let mut d: Vec<f64> = (0..=p).map(|j| self.coeffs[j + span - p]).collect();
        for r in 1..=p {
            for j in (r..=p).rev() {
                let i = j + span - p;
                let denom = self.knots[i + p + 1 - r] - self.knots[i];
                let alpha = if denom == 0.0 {
                    0.0
                } else {
                    (x - self.knots[i]) / denom
                };
                d[j] = (1.0 - alpha) * d[j - 1] + alpha * d[j];
            }
        }
        d[p]
    }

    /// The analytic first derivative, one degree lower.
    pub fn derivative(&self) -> BSpline {
        let p = self.degree;
        if p == 0 || self.coeffs.len() < 2 {
            return BSpline {
                knots: self.knots.clone(),
                coeffs: vec![0.0; self.coeffs.len()],
                degree: p,
            };
        }
        let coeffs = (0..self.coeffs.len() - 1)
            .map(|i| {
                let denom = self.knots[i + p + 1] - self.knots[i + 1];
                if denom == 0.0 {
                    0.0
                } else {
                    p as f64 * (self.coeffs[i + 1] - self.coeffs[i]) / denom
                }
            })
            .collect();
        BSpline {
            knots: self.knots[1..self.knots.len() - 1].to_vec(),
            coeffs,
            degree: p - 1,
        }
    }
}

/// `n` evenly spaced points from `start` to `end`, both included.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            let mut out: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
            out[n - 1] = end;
            out
        }
    }
}

/// Fits a quintic smoothing spline to ascending `x`.
///
/// `smoothing` bounds the residual sum of squares `sum((y - s(x))^2)`.
pub fn fit_smoothing_spline(x: &[f64], y: &[f64], smoothing: f64) -> Result<BSpline> {
    let p = SPLINE_DEGREE;
    if x.len() != y.len() {
        return Err(TransformError::LengthMismatch {
            x: x.len(),
            y: y.len(),
        });
    }
    let n = x.len();
    if n < p + 1 {
        return Err(TransformError::InsufficientSamples {
            required: p + 1,
            found: n,
        });
    }
    if !smoothing.is_finite() || smoothing < 0.0 {
        return Err(TransformError::InvalidSmoothness(smoothing));
    }
    if let Some(index) = x
        .iter()
        .zip(y)
        .position(|(a, b)| !a.is_finite() || !b.is_finite())
    {
        return Err(TransformError::NonFinite { index });
    }
    if let Some(index) = x.windows(2).position(|w| w[1] < w[0]) {
        // Callers orient and sort first; an unsorted axis is a misuse.
        return Err(TransformError::DegenerateAxis { index: index + 1 });
    }
    let (lo, hi) = (x[0], x[n - 1]);
    if hi <= lo {
        return Err(TransformError::DegenerateAxis { index: n - 1 });
    }

    let interior = (n - p - 1).min(MAX_INTERIOR_KNOTS);
    let m = interior + p + 1;
    let knots = clamped_knots(lo, hi, interior, p);

    let rows: Vec<(usize, Vec<f64>)> = x
        .iter()
        .map(|&xi| {
            let span = find_span(&knots, m, p, xi);
            (span, basis_funs(&knots, span, p, xi))
        })
        .collect();

    let mut normal = vec![vec![0.0; m]; m];
    let mut rhs = vec![0.0; m];
    for ((span, basis), &yi) in rows.iter().zip(y) {
        let first = span - p;
        for a in 0..=p {
            rhs[first + a] += basis[a] * yi;
            for b in 0..=p {
                normal[first + a][first + b] += basis[a] * basis[b];
            }
        }
    }
    let penalty = difference_penalty(m, PENALTY_ORDER);

    let trace_normal: f64 = (0..m).map(|i| normal[i][i]).sum();
    let trace_penalty: f64 = (0..m).map(|i| penalty[i][i]).sum();
    let scale = if trace_penalty > 0.0 {
        trace_normal / trace_penalty
    } else {
        0.0
    };
    let ridge = 1e-12 * trace_normal / m as f64;

    let solve = |rho: f64| -> Vec<f64> {
        let mut system = normal.clone();
        for i in 0..m {
            for j in 0..m {
                system[i][j] += rho * scale * penalty[i][j];
            }
            system[i][i] += ridge;
        }
        cholesky_solve(system, &rhs)
    };
    let residual = |coeffs: &[f64]| -> f64 {
        rows.iter()
            .zip(y)
            .map(|((span, basis), &yi)| {
                let fitted: f64 = (0..=p).map(|a| basis[a] * coeffs[span - p + a]).sum();
                (yi - fitted).powi(2)
            })
            .sum()
    };

    let tight = solve(RHO_MIN);
    let tight_rss = residual(&tight);
    let coeffs = if tight_rss >= smoothing || scale == 0.0 {
        tight
    } else {
        let loose = solve(RHO_MAX);
        if residual(&loose) <= smoothing {
            loose
        } else {
            let (mut lo_rho, mut hi_rho) = (RHO_MIN, RHO_MAX);
            for _ in 0..SEARCH_STEPS {
                let mid = (lo_rho * hi_rho).sqrt();
                if residual(&solve(mid)) > smoothing {
                    hi_rho = mid;
                } else {
                    lo_rho = mid;
                }
            }
            trace!(rho = lo_rho, "smoothing spline penalty selected");
            solve(lo_rho)
        }
    };

    Ok(BSpline {
        knots,
        coeffs,
        degree: p,
    })
}

fn clamped_knots(lo: f64, hi: f64, interior: usize, p: usize) -> Vec<f64> {
    let mut knots = Vec::with_capacity(interior + 2 * (p + 1));
    knots.extend(std::iter::repeat_n(lo, p + 1));
    for i in 1..=interior {
        knots.push(lo + (hi - lo) * i as f64 / (interior + 1) as f64);
    }
    knots.extend(std::iter::repeat_n(hi, p + 1));
    knots
}

/// Index of the knot span containing `x` for a basis of `n` functions.
fn find_span(knots: &[f64], n: usize, p: usize, x: f64) -> usize {
    if x >= knots[n] {
        return n - 1;
    }
    if x <= knots[p] {
        return p;
    }
    let (mut low, mut high) = (p, n);
    let mut mid = (low + high) / 2;
    while x < knots[mid] || x >= knots[mid + 1] {
        if x < knots[mid] {
            high = mid;
        } else {
            low = mid;
        }
        mid = (low + high) / 2;
    }
    mid
}

/// Values of the `p + 1` basis functions that are non-zero on `span`.
fn basis_funs(knots: &[f64], span: usize, p: usize, x: f64) -> Vec<f64> {
    let mut values = vec![0.0; p + 1];
    let mut left = vec![0.0; p + 1];
    let mut right = vec![0.0; p + 1];
    values[0] = 1.0;
    for j in 1..=p {
        left[j] = x - knots[span + 1 - j];
        right[j] = knots[span + j] - x;
        let mut saved = 0.0;
        for r in 0..j {
            let denom = right[r + 1] + left[j - r];
            let temp = if denom == 0.0 { 0.0 } else { values[r] / denom };
            values[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        values[j] = saved;
    }
    values
}

/// `D^T D` for the order-`order` difference matrix on `m` coefficients.
fn difference_penalty(m: usize, order: usize) -> Vec<Vec<f64>> {
    let mut penalty = vec![vec![0.0; m]; m];
    if m <= order {
        return penalty;
    }
    let weights = difference_weights(order);
    for row in 0..m - order {
        for (a, wa) in weights.iter().enumerate() {
            for (b, wb) in weights.iter().enumerate() {
                penalty[row + a][row + b] += wa * wb;
            }
        }
    }
    penalty
}

/// Signed binomial coefficients of the forward difference of `order`.
fn difference_weights(order: usize) -> Vec<f64> {
    let mut weights = vec![1.0];
    for _ in 0..order {
        let mut next = vec![0.0; weights.len() + 1];
        for (i, w) in weights.iter().enumerate() {
            next[i] -= w;
            next[i + 1] += w;
        }
        weights = next;
    }
    weights
}

/// Solves a symmetric positive definite system in place.
///
/// Pivots that collapse through rounding are floored so the solve always
/// produces finite coefficients.
fn cholesky_solve(mut a: Vec<Vec<f64>>, b: &[f64]) -> Vec<f64> {
    let n = b.len();
    let floor = a
        .iter()
        .enumerate()
        .map(|(i, row)| row[i].abs())
        .fold(0.0_f64, f64::max)
        .max(f64::MIN_POSITIVE)
        * 1e-14;
    for j in 0..n {
        let mut diag = a[j][j];
        for k in 0..j {
            diag -= a[j][k] * a[j][k];
        }
        let diag = diag.max(floor).sqrt();
        a[j][j] = diag;
        for i in j + 1..n {
            let mut sum = a[i][j];
            for k in 0..j {
                sum -= a[i][k] * a[j][k];
            }
            a[i][j] = sum / diag;
        }
    }

    let mut z = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= a[i][k] * z[k];
        }
        z[i] = sum / a[i][i];
    }
    let mut out = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = z[i];
        for k in i + 1..n {
            sum -= a[k][i] * out[k];
        }
        out[i] = sum / a[i][i];
    }
    out
}
