//! Numerical differentiation on non-uniform grids.

use crate::error::{Result, TransformError};

/// Derivative of `y` with respect to `x`.
///
/// Interior points use second-order central differences that account for
/// uneven spacing; the two end points use one-sided first-order differences.
/// The output has the same length as the input.
pub fn gradient(x: &[f64], y: &[f64]) -> Result<Vec<f64>> {
    if x.len() != y.len() {
        return Err(TransformError::LengthMismatch {
            x: x.len(),
            y: y.len(),
        });
    }
    let n = x.len();
    if n < 2 {
        return Err(TransformError::InsufficientSamples {
            required: 2,
            found: n,
        });
    }

    let step = |i: usize| -> Result<f64> {
        let dx = x[i + 1] - x[i];
        if dx == 0.0 {
            return Err(TransformError::DegenerateAxis { index: i + 1 });
        }
        Ok(dx)
    };

    let mut out = Vec::with_capacity(n);
    out.push((y[1] - y[0]) / step(0)?);
    for i in 1..n - 1 {
        let h1 = step(i - 1)?;
        let h2 = step(i)?;
        let a = -h2 / (h1 * (h1 + h2));
        let b = (h2 - h1) / (h1 * h2);
        let c = h1 / (h2 * (h1 + h2));
        out.push(a * y[i - 1] + b * y[i] + c * y[i + 1]);
    }
    out.push((y[n - 1] - y[n - 2]) / step(n - 2)?);
    Ok(out)
}
