//! Scan image pipeline: line flattening, offset and intensity mapping.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TransformError};

/// Colour scale applied when turning pixel values into intensities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IntensityScale {
    #[default]
    Linear,
    Log,
}

impl fmt::Display for IntensityScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntensityScale::Linear => f.write_str("Linear"),
            IntensityScale::Log => f.write_str("Log"),
        }
    }
}

impl FromStr for IntensityScale {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "linear" | "lin" => Ok(IntensityScale::Linear),
            "log" => Ok(IntensityScale::Log),
            _ => Err(format!("Unknown intensity scale: {s}")),
        }
    }
}

/// Row-major image of one scan channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFrame {
    rows: usize,
    cols: usize,
    pixels: Vec<f64>,
}

impl ImageFrame {
    pub fn new(rows: usize, cols: usize, pixels: Vec<f64>) -> Result<Self> {
        let expected = rows * cols;
        if pixels.len() != expected {
            return Err(TransformError::ShapeMismatch {
                rows,
                cols,
                expected,
                found: pixels.len(),
            });
        }
        Ok(Self { rows, cols, pixels })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn pixels(&self) -> &[f64] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<f64> {
        self.pixels
    }

    /// Subtracts the least-squares line from every scan line.
    ///
    /// NaN pixels (unfinished scan lines) are skipped in the fit and kept.
    pub fn flatten_lines(mut self) -> Self {
        if self.cols == 0 {
            return self;
        }
        for line in self.pixels.chunks_mut(self.cols) {
            let samples: Vec<(f64, f64)> = line
                .iter()
                .enumerate()
                .filter(|(_, v)| v.is_finite())
                .map(|(i, v)| (i as f64, *v))
                .collect();
            let Some((slope, intercept)) = fit_line(&samples) else {
                continue;
            };
            for (i, v) in line.iter_mut().enumerate() {
                *v -= slope * i as f64 + intercept;
            }
        }
        self
    }

    pub fn apply_offset(mut self, offset: f64) -> Self {
        for v in &mut self.pixels {
            *v -= offset;
        }
        self
    }

    /// Shifts the image so its smallest finite pixel is zero.
    pub fn remove_minimum(self) -> Self {
        match finite_range(self.pixels.iter().copied()) {
            Some((min, _)) => self.apply_offset(min),
            None => self,
        }
    }

    /// Normalised intensities in `[0, 1]`, one per pixel.
    ///
    /// `Log` works on absolute values; pixels that are zero or not finite
    /// map to 0. A flat image maps to all zeros.
    pub fn map_intensity(&self, scale: IntensityScale) -> Vec<f64> {
        match scale {
            IntensityScale::Linear => normalise(&self.pixels),
            IntensityScale::Log => {
                let logs: Vec<f64> = self
                    .pixels
                    .iter()
                    .map(|v| {
                        let magnitude = v.abs();
                        if magnitude > 0.0 {
                            magnitude.ln()
                        } else {
                            f64::NAN
                        }
                    })
                    .collect();
                normalise(&logs)
            }
        }
    }
}

fn fit_line(samples: &[(f64, f64)]) -> Option<(f64, f64)> {
    let n = samples.len() as f64;
    match samples.len() {
        0 => None,
        1 => Some((0.0, samples[0].1)),
        _ => {
            let mean_x = samples.iter().map(|s| s.0).sum::<f64>() / n;
            let mean_y = samples.iter().map(|s| s.1).sum::<f64>() / n;
            let sxx: f64 = samples.iter().map(|s| (s.0 - mean_x).powi(2)).sum();
            let sxy: f64 = samples
                .iter()
                .map(|s| (s.0 - mean_x) * (s.1 - mean_y))
                .sum();
            let slope = sxy / sxx;
            Some((slope, mean_y - slope * mean_x))
        }
    }
}

fn finite_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.filter(|v| v.is_finite()).fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

fn normalise(values: &[f64]) -> Vec<f64> {
    let Some((lo, hi)) = finite_range(values.iter().copied()) else {
        return vec![0.0; values.len()];
    };
    let span = hi - lo;
    values
        .iter()
        .map(|v| {
            if !v.is_finite() || span == 0.0 {
                0.0
            } else {
                (v - lo) / span
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_is_checked() {
        let err = ImageFrame::new(2, 3, vec![0.0; 5]).unwrap_err();
        assert_eq!(
            err,
            TransformError::ShapeMismatch {
                rows: 2,
                cols: 3,
                expected: 6,
                found: 5
            }
        );
    }

    #[test]
    fn flatten_removes_tilted_lines() {
        let pixels = vec![1.0, 2.0, 3.0, 10.0, 8.0, 6.0];
        let frame = ImageFrame::new(2, 3, pixels).unwrap().flatten_lines();
        assert!(frame.pixels().iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn flatten_keeps_unfinished_lines() {
        let pixels = vec![1.0, 2.0, f64::NAN, f64::NAN];
        let frame = ImageFrame::new(2, 2, pixels).unwrap().flatten_lines();
        assert!(frame.pixels()[0].abs() < 1e-12);
        assert!(frame.pixels()[2].is_nan());
    }

    #[test]
    fn offset_and_minimum() {
        let frame = ImageFrame::new(1, 3, vec![5.0, 7.0, 6.0]).unwrap();
        assert_eq!(frame.clone().apply_offset(5.0).pixels(), &[0.0, 2.0, 1.0]);
        assert_eq!(frame.remove_minimum().pixels(), &[0.0, 2.0, 1.0]);
    }

    #[test]
    fn linear_intensity_spans_unit_interval() {
        let frame = ImageFrame::new(1, 3, vec![-1.0, 0.0, 3.0]).unwrap();
        assert_eq!(frame.map_intensity(IntensityScale::Linear), vec![0.0, 0.25, 1.0]);
    }

    #[test]
    fn log_intensity_uses_magnitudes() {
        let frame = ImageFrame::new(1, 4, vec![1.0, -10.0, 100.0, 0.0]).unwrap();
        let mapped = frame.map_intensity(IntensityScale::Log);
        assert!((mapped[0] - 0.0).abs() < 1e-12);
        assert!((mapped[1] - 0.5).abs() < 1e-12);
        assert!((mapped[2] - 1.0).abs() < 1e-12);
        assert_eq!(mapped[3], 0.0);
    }

    #[test]
    fn flat_image_maps_to_zero() {
        let frame = ImageFrame::new(2, 2, vec![4.0; 4]).unwrap();
        assert_eq!(frame.map_intensity(IntensityScale::Linear), vec![0.0; 4]);
        assert_eq!("log".parse::<IntensityScale>().unwrap(), IntensityScale::Log);
    }
}
