//! Curve transform: the derived-curve options offered for spectra.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TransformError};
use crate::gradient::gradient;
use crate::spline::{SPLINE_DEGREE, fit_smoothing_spline, linspace};

/// Smoothing factor used when a record has none stored.
pub const DEFAULT_SMOOTHNESS: f64 = 9e-10;

/// How a sampled curve is transformed before plotting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveMode {
    /// `Y(X)`: the data as measured.
    #[default]
    Identity,
    /// `Y(X) _ spline`: quintic smoothing spline resampled on a uniform grid.
    Smoothed,
    /// `dY/dX _ spline`: derivative of the smoothing spline on that grid.
    SmoothedDerivative,
    /// `dY/dX _ grad`: central differences on the raw samples.
    RawDerivative,
}

impl CurveMode {
    pub const ALL: [CurveMode; 4] = [
        CurveMode::Identity,
        CurveMode::Smoothed,
        CurveMode::SmoothedDerivative,
        CurveMode::RawDerivative,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CurveMode::Identity => "Y(X)",
            CurveMode::Smoothed => "Y(X) _ spline",
            CurveMode::SmoothedDerivative => "dY/dX _ spline",
            CurveMode::RawDerivative => "dY/dX _ grad",
        }
    }

    /// Text appended to the y-axis label.
    pub fn axis_suffix(&self) -> &'static str {
        match self {
            CurveMode::Identity => "",
            CurveMode::Smoothed => "spline(Y(X))",
            CurveMode::SmoothedDerivative => "dspline(Y(X))/dX",
            CurveMode::RawDerivative => "dY(X)/dX",
        }
    }

    /// Whether the smoothing factor affects the result.
    pub fn uses_smoothness(&self) -> bool {
        matches!(self, CurveMode::Smoothed | CurveMode::SmoothedDerivative)
    }

    /// The mode to fall back on when a curve is too short for a spline.
    pub fn fallback(&self) -> CurveMode {
        match self {
            CurveMode::Smoothed => CurveMode::Identity,
            CurveMode::SmoothedDerivative => CurveMode::RawDerivative,
            other => *other,
        }
    }
}

impl fmt::Display for CurveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CurveMode {
    type Err = String;

    /// Accepts the display labels as well as short names.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(mode) = CurveMode::ALL.iter().find(|mode| mode.label() == trimmed) {
            return Ok(*mode);
        }
        match trimmed.to_lowercase().replace('_', "-").as_str() {
            "identity" | "raw" => Ok(CurveMode::Identity),
            "smoothed" | "spline" => Ok(CurveMode::Smoothed),
            "smoothed-derivative" | "spline-derivative" => Ok(CurveMode::SmoothedDerivative),
            "raw-derivative" | "grad" | "gradient" => Ok(CurveMode::RawDerivative),
            _ => Err(format!("Unknown curve mode: {s}")),
        }
    }
}

/// A transformed curve.
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

/// Applies `mode` to the curve `(x, y)`.
///
/// `smoothness` is the spline smoothing factor and is ignored by the
/// non-spline modes. Spline modes need at least six samples and report
/// [`TransformError::InsufficientSamples`] otherwise; see
/// [`CurveMode::fallback`].
pub fn transform_curve(x: &[f64], y: &[f64], mode: CurveMode, smoothness: f64) -> Result<Curve> {
    if x.len() != y.len() {
        return Err(TransformError::LengthMismatch {
            x: x.len(),
            y: y.len(),
        });
    }
    match mode {
        CurveMode::Identity => Ok(Curve {
            x: x.to_vec(),
            y: y.to_vec(),
        }),
        CurveMode::RawDerivative => Ok(Curve {
            x: x.to_vec(),
            y: gradient(x, y)?,
        }),
        CurveMode::Smoothed => smoothed(x, y, smoothness, false),
        CurveMode::SmoothedDerivative => smoothed(x, y, smoothness, true),
    }
}

fn smoothed(x: &[f64], y: &[f64], smoothness: f64, derivative: bool) -> Result<Curve> {
    let n = x.len();
    if n < SPLINE_DEGREE + 1 {
        return Err(TransformError::InsufficientSamples {
            required: SPLINE_DEGREE + 1,
            found: n,
        });
    }

    // The spline only ever sees ascending knots; descending sweeps are
    // reversed here and restored after resampling.
    let descending = x[0] > x[n - 1];
    let mut pairs: Vec<(f64, f64)> = x.iter().copied().zip(y.iter().copied()).collect();
    if descending {
        pairs.reverse();
    }
    if pairs.windows(2).any(|w| w[1].0 < w[0].0) {
        debug!(samples = n, "sorting non-monotonic curve before spline fit");
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
    }
    let (xs, ys): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();

    let spline = fit_smoothing_spline(&xs, &ys, smoothness)?;
    let mut grid = linspace(xs[0], xs[n - 1], n);
    let mut values: Vec<f64> = if derivative {
        let slope = spline.derivative();
        grid.iter().map(|&g| slope.eval(g)).collect()
    } else {
        grid.iter().map(|&g| spline.eval(g)).collect()
    };

    if descending {
        grid.reverse();
        values.reverse();
    }
    Ok(Curve { x: grid, y: values })
}
