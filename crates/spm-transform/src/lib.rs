//! Numerical transforms used when rendering measurements.
//!
//! - [`transform_curve`] maps a sampled curve through one of the four
//!   [`CurveMode`]s (identity, smoothing spline, spline derivative, raw
//!   derivative).
//! - [`ImageFrame`] carries a scan image through line flattening, offset
//!   and linear/log intensity mapping.
//!
//! Everything here is a pure function of its inputs and safe to call from
//! any thread.

mod curve;
mod error;
mod gradient;
mod image;
mod spline;

pub use curve::{Curve, CurveMode, DEFAULT_SMOOTHNESS, transform_curve};
pub use error::{Result, TransformError};
pub use gradient::gradient;
pub use image::{ImageFrame, IntensityScale};
pub use spline::{BSpline, SPLINE_DEGREE, fit_smoothing_spline, linspace};
