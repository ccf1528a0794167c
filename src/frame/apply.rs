//! Axis-wise reductions ("apply").
//!
//! A reduction sees one 1D slice at a time: a column (one wavelength across
//! all spectra) for `axis = 0`, or a row (one spectrum across all
//! wavelengths) for `axis = 1`. Each call yields a [`SliceOutput`]; the arity
//! of the first slice fixes the output shape:
//!
//! ```text
//! axis  per slice   spc          wl          data
//! 0     scalar      (1, n_wl)    unchanged   no columns, 1 row
//! 0     vector k    (k, n_wl)    unchanged   no columns, k rows
//! 1     scalar      (n_spc, 1)   [0]         unchanged
//! 1     vector k    (n_spc, k)   0..k        unchanged
//! ```

use std::fmt;

use ndarray::{Array1, Array2, ArrayView1, Axis};

use super::{default_wl, SpectraFrame};
use crate::data::table::MetadataTable;
use crate::error::{FrameError, Result};

// ---------------------------------------------------------------------------
// Per-slice results
// ---------------------------------------------------------------------------

/// How many values a reduction yields per slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Scalar,
    Vector(usize),
}

impl Arity {
    /// Number of values per slice.
    pub fn width(self) -> usize {
        match self {
            Arity::Scalar => 1,
            Arity::Vector(k) => k,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Scalar => write!(f, "a scalar"),
            Arity::Vector(k) => write!(f, "a vector of length {k}"),
        }
    }
}

/// Result of reducing one slice.
#[derive(Debug, Clone, PartialEq)]
pub enum SliceOutput {
    Scalar(f64),
    Vector(Vec<f64>),
}

impl SliceOutput {
    pub fn arity(&self) -> Arity {
        match self {
            SliceOutput::Scalar(_) => Arity::Scalar,
            SliceOutput::Vector(values) => Arity::Vector(values.len()),
        }
    }

    pub fn values(&self) -> &[f64] {
        match self {
            SliceOutput::Scalar(v) => std::slice::from_ref(v),
            SliceOutput::Vector(values) => values,
        }
    }
}

impl From<f64> for SliceOutput {
    fn from(v: f64) -> Self {
        SliceOutput::Scalar(v)
    }
}

impl From<Vec<f64>> for SliceOutput {
    fn from(values: Vec<f64>) -> Self {
        SliceOutput::Vector(values)
    }
}

impl<const N: usize> From<[f64; N]> for SliceOutput {
    fn from(values: [f64; N]) -> Self {
        SliceOutput::Vector(values.to_vec())
    }
}

impl From<Array1<f64>> for SliceOutput {
    fn from(values: Array1<f64>) -> Self {
        SliceOutput::Vector(values.to_vec())
    }
}

// ---------------------------------------------------------------------------
// Named reductions
// ---------------------------------------------------------------------------

/// Built-in reductions addressable by name.
///
/// Empty slices reduce to `0` (sum), `1` (prod) or NaN (everything else).
#[derive(Debug, Clone, PartialEq)]
pub enum NamedReduction {
    Sum,
    Prod,
    Mean,
    Median,
    Min,
    Max,
    /// Peak to peak, `max - min`.
    Ptp,
    /// Population standard deviation.
    Std,
    /// Population variance.
    Var,
    /// Quantiles at levels in `[0, 1]`, linear interpolation.
    Quantile(Vec<f64>),
    /// Percentiles at levels in `[0, 100]`.
    Percentile(Vec<f64>),
}

impl NamedReduction {
    /// Resolve a reduction by name. `args` carries the levels for
    /// `quantile`/`percentile` and must be empty for everything else.
    pub fn parse(name: &str, args: &[f64]) -> Result<Self> {
        let invalid = |reason: &str| FrameError::InvalidReductionArgs {
            name: name.to_string(),
            reason: reason.to_string(),
        };
        let reduction = match name {
            "sum" => NamedReduction::Sum,
            "prod" => NamedReduction::Prod,
            "mean" => NamedReduction::Mean,
            "median" => NamedReduction::Median,
            "min" => NamedReduction::Min,
            "max" => NamedReduction::Max,
            "ptp" => NamedReduction::Ptp,
            "std" => NamedReduction::Std,
            "var" => NamedReduction::Var,
            "quantile" | "percentile" => {
                let upper = if name == "quantile" { 1.0 } else { 100.0 };
                if args.is_empty() {
                    return Err(invalid("at least one level is required"));
                }
                if let Some(level) = args.iter().find(|q| !(0.0..=upper).contains(*q)) {
                    return Err(invalid(&format!("level {level} is outside [0, {upper}]")));
                }
                return Ok(if name == "quantile" {
                    NamedReduction::Quantile(args.to_vec())
                } else {
                    NamedReduction::Percentile(args.to_vec())
                });
            }
            other => return Err(FrameError::UnknownReduction(other.to_string())),
        };
        if !args.is_empty() {
            return Err(invalid("takes no arguments"));
        }
        Ok(reduction)
    }

    pub fn name(&self) -> &'static str {
        match self {
            NamedReduction::Sum => "sum",
            NamedReduction::Prod => "prod",
            NamedReduction::Mean => "mean",
            NamedReduction::Median => "median",
            NamedReduction::Min => "min",
            NamedReduction::Max => "max",
            NamedReduction::Ptp => "ptp",
            NamedReduction::Std => "std",
            NamedReduction::Var => "var",
            NamedReduction::Quantile(_) => "quantile",
            NamedReduction::Percentile(_) => "percentile",
        }
    }

    /// Arity known before any slice is seen.
    pub fn arity(&self) -> Arity {
        match self {
            NamedReduction::Quantile(levels) | NamedReduction::Percentile(levels) => {
                Arity::Vector(levels.len())
            }
            _ => Arity::Scalar,
        }
    }

    pub fn evaluate(&self, lane: ArrayView1<'_, f64>) -> SliceOutput {
        match self {
            NamedReduction::Sum => lane.sum().into(),
            NamedReduction::Prod => lane.product().into(),
            NamedReduction::Mean => mean(lane).into(),
            NamedReduction::Median => quantiles(lane, [0.5].into_iter())[0].into(),
            NamedReduction::Min => extreme(lane, f64::min).into(),
            NamedReduction::Max => extreme(lane, f64::max).into(),
            NamedReduction::Ptp => (extreme(lane, f64::max) - extreme(lane, f64::min)).into(),
            NamedReduction::Std => variance(lane).sqrt().into(),
            NamedReduction::Var => variance(lane).into(),
            NamedReduction::Quantile(levels) => quantiles(lane, levels.iter().copied()).into(),
            NamedReduction::Percentile(levels) => {
                quantiles(lane, levels.iter().map(|p| p / 100.0)).into()
            }
        }
    }
}

fn mean(lane: ArrayView1<'_, f64>) -> f64 {
    lane.sum() / lane.len() as f64
}

fn variance(lane: ArrayView1<'_, f64>) -> f64 {
    let mu = mean(lane);
    lane.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / lane.len() as f64
}

/// Smallest/largest value; NaN if the slice is empty or holds a NaN.
fn extreme(lane: ArrayView1<'_, f64>, pick: fn(f64, f64) -> f64) -> f64 {
    let mut values = lane.iter().copied();
    match values.next() {
        Some(first) if !first.is_nan() => values
            .try_fold(first, |acc, v| (!v.is_nan()).then(|| pick(acc, v)))
            .unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

/// Linear-interpolation quantiles between order statistics.
fn quantiles(lane: ArrayView1<'_, f64>, levels: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut sorted = lane.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    levels
        .map(|q| {
            if n == 0 {
                return f64::NAN;
            }
            let pos = q * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            lerp(sorted[lo], sorted[hi], pos - lo as f64)
        })
        .collect()
}

/// Interpolate from whichever end is closer, so `t = 1` returns `b` exactly.
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    let diff = b - a;
    if t >= 0.5 {
        b - diff * (1.0 - t)
    } else {
        a + diff * t
    }
}

// ---------------------------------------------------------------------------
// Reduction
// ---------------------------------------------------------------------------

type SliceFn = dyn Fn(ArrayView1<'_, f64>) -> SliceOutput + Send + Sync;

/// A reduction target: a built-in by name or a caller-supplied function.
pub enum Reduction {
    Named(NamedReduction),
    Custom(Box<SliceFn>),
}

impl Reduction {
    /// See [`NamedReduction::parse`].
    pub fn named(name: &str, args: &[f64]) -> Result<Self> {
        NamedReduction::parse(name, args).map(Reduction::Named)
    }

    /// Wrap a function returning a scalar or a fixed-length vector per slice.
    pub fn custom<F, O>(f: F) -> Self
    where
        F: Fn(ArrayView1<'_, f64>) -> O + Send + Sync + 'static,
        O: Into<SliceOutput>,
    {
        Reduction::Custom(Box::new(move |lane: ArrayView1<'_, f64>| f(lane).into()))
    }

    fn evaluate(&self, lane: ArrayView1<'_, f64>) -> SliceOutput {
        match self {
            Reduction::Named(named) => named.evaluate(lane),
            Reduction::Custom(f) => f(lane),
        }
    }

    fn declared_arity(&self) -> Option<Arity> {
        match self {
            Reduction::Named(named) => Some(named.arity()),
            Reduction::Custom(_) => None,
        }
    }
}

impl From<NamedReduction> for Reduction {
    fn from(named: NamedReduction) -> Self {
        Reduction::Named(named)
    }
}

impl fmt::Debug for Reduction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reduction::Named(named) => f.debug_tuple("Named").field(named).finish(),
            Reduction::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

// ---------------------------------------------------------------------------
// SpectraFrame entry points
// ---------------------------------------------------------------------------

impl SpectraFrame {
    /// Reduce every slice along `axis` and reshape wavelength axis and
    /// metadata to match (see the module docs for the table).
    ///
    /// # Errors
    ///
    /// * [`FrameError::InvalidAxis`] unless `axis` is 0 or 1
    /// * [`FrameError::RaggedReduction`] if slices disagree on their arity
    pub fn apply(&self, reduction: &Reduction, axis: Axis) -> Result<SpectraFrame> {
        self.reduce_lanes(|lane| reduction.evaluate(lane), axis, reduction.declared_arity())
            .inspect(|frame| {
                log::debug!(
                    "apply {reduction:?} along axis {}: {:?} -> {:?}",
                    axis.index(),
                    self.shape(),
                    frame.shape()
                )
            })
    }

    /// [`apply`](Self::apply) with a reduction resolved by name.
    pub fn apply_named(&self, name: &str, args: &[f64], axis: Axis) -> Result<SpectraFrame> {
        self.apply(&Reduction::named(name, args)?, axis)
    }

    /// [`apply`](Self::apply) with a caller-supplied function.
    pub fn apply_fn<F, O>(&self, f: F, axis: Axis) -> Result<SpectraFrame>
    where
        F: Fn(ArrayView1<'_, f64>) -> O,
        O: Into<SliceOutput>,
    {
        self.reduce_lanes(|lane| f(lane).into(), axis, None)
    }

    fn reduce_lanes<F>(&self, f: F, axis: Axis, declared: Option<Arity>) -> Result<SpectraFrame>
    where
        F: Fn(ArrayView1<'_, f64>) -> SliceOutput,
    {
        if axis.index() > 1 {
            return Err(FrameError::InvalidAxis(axis.index()));
        }
        let n_slices = match axis.index() {
            0 => self.nwl(),
            _ => self.nspc(),
        };

        let mut arity = None;
        let mut values = Vec::new();
        for (slice, lane) in self.spc.lanes(axis).into_iter().enumerate() {
            let out = f(lane);
            let got = out.arity();
            match arity {
                None => arity = Some(got),
                Some(expected) if expected != got => {
                    return Err(FrameError::RaggedReduction {
                        slice,
                        expected,
                        got,
                    })
                }
                Some(_) => {}
            }
            values.extend_from_slice(out.values());
        }
        // No slices to look at: fall back to what the reduction declares.
        let arity = arity.or(declared).unwrap_or(Arity::Scalar);
        let k = arity.width();
        log::trace!("{n_slices} slices, {arity} each");

        // One row per slice, one column per output value.
        let per_slice = Array2::from_shape_fn((n_slices, k), |(i, j)| values[i * k + j]);

        Ok(match axis.index() {
            0 => SpectraFrame {
                spc: per_slice.reversed_axes().as_standard_layout().into_owned(),
                wl: self.wl.clone(),
                data: MetadataTable::empty(k),
            },
            _ => SpectraFrame {
                spc: per_slice,
                wl: default_wl(k),
                data: self.data.clone(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array};

    use super::*;
    use crate::frame::axis;

    fn sample_spectra_frame() -> SpectraFrame {
        let data = MetadataTable::from_columns(vec![
            ("A".to_string(), vec![10, 11, 12]),
            ("B".to_string(), vec![13, 14, 15]),
            ("C".to_string(), vec![16, 17, 18]),
        ])
        .unwrap()
        .with_index([5, 6, 7])
        .unwrap();
        SpectraFrame::new(
            array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]],
            Some(array![400.0, 500.0, 600.0]),
            Some(data),
        )
        .unwrap()
    }

    #[test]
    fn test_string_function_scalar() {
        let frame = sample_spectra_frame();

        let result = frame.apply_named("sum", &[], axis::ROWS).unwrap();
        assert_eq!(result.spc(), &array![[12.0, 15.0, 18.0]]);
        assert_eq!(result.wl(), frame.wl());
        assert_eq!(result.data().shape(), (1, 0));

        let result = frame.apply_named("mean", &[], axis::COLS).unwrap();
        assert_eq!(result.spc(), &array![[2.0], [5.0], [8.0]]);
        assert_eq!(result.wl(), &array![0.0]);
        assert_eq!(result.data(), frame.data());
    }

    #[test]
    fn test_string_function_vector() {
        let frame = sample_spectra_frame();
        let q = [0.1, 0.2, 0.3, 0.4, 0.5];

        let result = frame.apply_named("quantile", &q, axis::ROWS).unwrap();
        assert_eq!(result.shape(), (5, 3));
        // Column 0 is [1, 4, 7]; position q * 2 interpolates in steps of 3.
        let expected = Array::from_shape_fn((5, 3), |(i, j)| 1.0 + j as f64 + 6.0 * q[i]);
        assert_abs_diff_eq!(*result.spc(), expected, epsilon = 1e-12);
        assert_eq!(result.wl(), frame.wl());
        assert_eq!(result.data().shape(), (5, 0));

        let result = frame.apply_named("quantile", &q, axis::COLS).unwrap();
        assert_eq!(result.shape(), (3, 5));
        let expected = Array::from_shape_fn((3, 5), |(i, j)| 1.0 + 3.0 * i as f64 + 2.0 * q[j]);
        assert_abs_diff_eq!(*result.spc(), expected, epsilon = 1e-12);
        assert_eq!(result.wl(), &array![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(result.data(), frame.data());
    }

    #[test]
    fn test_custom_function_scalar() {
        let frame = sample_spectra_frame();
        let custom_function = |x: ArrayView1<'_, f64>| x.sum() * 2.0;

        let result = frame.apply_fn(custom_function, axis::ROWS).unwrap();
        assert_eq!(result.spc(), &array![[24.0, 30.0, 36.0]]);
        assert_eq!(result.wl(), frame.wl());
        assert_eq!(result.data().shape(), (1, 0));

        let result = frame.apply_fn(custom_function, axis::COLS).unwrap();
        assert_eq!(result.spc(), &array![[12.0], [30.0], [48.0]]);
        assert_eq!(result.wl(), &array![0.0]);
        assert_eq!(result.data(), frame.data());
    }

    #[test]
    fn test_custom_function_vector() {
        let frame = sample_spectra_frame();
        let reduction = Reduction::custom(|x: ArrayView1<'_, f64>| {
            [
                NamedReduction::Min.evaluate(x).values()[0],
                NamedReduction::Max.evaluate(x).values()[0],
            ]
        });

        let result = frame.apply(&reduction, axis::ROWS).unwrap();
        assert_eq!(result.spc(), &array![[1.0, 2.0, 3.0], [7.0, 8.0, 9.0]]);
        assert_eq!(result.wl(), frame.wl());
        assert_eq!(result.data().shape(), (2, 0));

        let result = frame.apply(&reduction, axis::COLS).unwrap();
        assert_eq!(result.spc(), &array![[1.0, 3.0], [4.0, 6.0], [7.0, 9.0]]);
        assert_eq!(result.wl(), &array![0.0, 1.0]);
        assert_eq!(result.data(), frame.data());
    }

    #[test]
    fn test_apply_leaves_input_untouched() {
        let frame = sample_spectra_frame();
        let before = frame.clone();
        let _ = frame.apply_named("std", &[], axis::ROWS).unwrap();
        assert_eq!(frame, before);
    }

    #[test]
    fn test_ragged_output_is_rejected() {
        let frame = sample_spectra_frame();
        let err = frame
            .apply_fn(|x| vec![0.0; x[0] as usize], axis::COLS)
            .unwrap_err();
        assert_eq!(
            err,
            FrameError::RaggedReduction {
                slice: 1,
                expected: Arity::Vector(1),
                got: Arity::Vector(4),
            }
        );
    }

    #[test]
    fn test_unknown_and_invalid_names() {
        let frame = sample_spectra_frame();
        assert_eq!(
            frame.apply_named("mode", &[], axis::ROWS).unwrap_err(),
            FrameError::UnknownReduction("mode".into())
        );
        assert!(matches!(
            frame.apply_named("quantile", &[], axis::ROWS).unwrap_err(),
            FrameError::InvalidReductionArgs { .. }
        ));
        assert!(matches!(
            frame.apply_named("quantile", &[1.5], axis::ROWS).unwrap_err(),
            FrameError::InvalidReductionArgs { .. }
        ));
        assert!(matches!(
            frame.apply_named("sum", &[1.0], axis::ROWS).unwrap_err(),
            FrameError::InvalidReductionArgs { .. }
        ));
        assert_eq!(
            frame.apply_named("sum", &[], Axis(2)).unwrap_err(),
            FrameError::InvalidAxis(2)
        );
    }

    #[test]
    fn test_named_statistics() {
        let lane = array![3.0, 1.0, 4.0, 1.0, 5.0];
        let eval = |name: &str, args: &[f64]| {
            NamedReduction::parse(name, args)
                .unwrap()
                .evaluate(lane.view())
        };
        assert_eq!(eval("sum", &[]), SliceOutput::Scalar(14.0));
        assert_eq!(eval("prod", &[]), SliceOutput::Scalar(60.0));
        assert_eq!(eval("median", &[]), SliceOutput::Scalar(3.0));
        assert_eq!(eval("ptp", &[]), SliceOutput::Scalar(4.0));
        assert_eq!(eval("percentile", &[0.0, 100.0]), SliceOutput::Vector(vec![1.0, 5.0]));
        assert_abs_diff_eq!(eval("var", &[]).values()[0], 2.56, epsilon = 1e-12);
        assert_abs_diff_eq!(eval("std", &[]).values()[0], 2.56f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_nan_propagates_through_extremes() {
        let lane = array![1.0, f64::NAN, 3.0];
        assert!(NamedReduction::Min.evaluate(lane.view()).values()[0].is_nan());
        assert!(NamedReduction::Max.evaluate(lane.view()).values()[0].is_nan());
    }

    #[test]
    fn test_zero_slices_use_declared_arity() {
        let frame = SpectraFrame::new(Array2::zeros((0, 3)), None, None).unwrap();
        let result = frame.apply_named("quantile", &[0.25, 0.75], axis::COLS).unwrap();
        assert_eq!(result.shape(), (0, 2));
        assert_eq!(result.wl(), &array![0.0, 1.0]);

        let result = frame.apply_named("sum", &[], axis::ROWS).unwrap();
        assert_eq!(result.spc(), &array![[0.0, 0.0, 0.0]]);
    }
}
