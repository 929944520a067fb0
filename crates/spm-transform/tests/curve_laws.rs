use proptest::prelude::*;
use spm_transform::{CurveMode, DEFAULT_SMOOTHNESS, TransformError, transform_curve};

const PROPTEST_CASES: u32 = 64;

/// Strictly monotonic x with bounded y, `len` samples.
fn arb_curve(len: std::ops::RangeInclusive<usize>) -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
    len.prop_flat_map(|n| {
        (
            -5.0f64..5.0,
            prop::collection::vec(0.01f64..1.0, n),
            prop::collection::vec(-1.0f64..1.0, n),
        )
    })
    .prop_map(|(start, steps, y)| {
        let mut x = Vec::with_capacity(steps.len());
        let mut current = start;
        for step in steps {
            x.push(current);
            current += step;
        }
        (x, y)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(PROPTEST_CASES))]

    #[test]
    fn identity_returns_curve_unchanged((x, y) in arb_curve(6..=40)) {
        let curve = transform_curve(&x, &y, CurveMode::Identity, DEFAULT_SMOOTHNESS).unwrap();
        prop_assert_eq!(curve.x, x);
        prop_assert_eq!(curve.y, y);
    }

    #[test]
    fn smoothed_descending_stays_descending((mut x, y) in arb_curve(6..=40), smoothing in 0.0f64..1.0) {
        x.reverse();
        let curve = transform_curve(&x, &y, CurveMode::Smoothed, smoothing).unwrap();
        prop_assert_eq!(curve.x.len(), x.len());
        prop_assert_eq!(curve.x[0], x[0]);
        prop_assert_eq!(curve.x[x.len() - 1], x[x.len() - 1]);
        prop_assert!(curve.x.windows(2).all(|w| w[1] < w[0]));
        prop_assert!(curve.y.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn smoothed_ascending_stays_ascending((x, y) in arb_curve(6..=40)) {
        let curve = transform_curve(&x, &y, CurveMode::SmoothedDerivative, DEFAULT_SMOOTHNESS).unwrap();
        prop_assert!(curve.x.windows(2).all(|w| w[1] > w[0]));
        prop_assert!(curve.y.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn short_curves_report_insufficient_samples((x, y) in arb_curve(0..=5)) {
        for mode in [CurveMode::Smoothed, CurveMode::SmoothedDerivative] {
            let err = transform_curve(&x, &y, mode, DEFAULT_SMOOTHNESS).unwrap_err();
            let reported = matches!(
                err,
                TransformError::InsufficientSamples { required: 6, found } if found == x.len()
            );
            prop_assert!(reported, "unexpected error: {:?}", err);
        }
    }
}
