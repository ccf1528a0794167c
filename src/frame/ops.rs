//! Element-wise arithmetic on the intensity matrix.
//!
//! Only `spc` takes part. The result keeps the wavelength axis and metadata
//! of the frame operand; with two frames, those of the left-hand side. The
//! right-hand frame's `wl` and `data` are ignored even when they differ.

use std::ops::{Add, Div, Mul, Neg, Sub};

use ndarray::Array2;

use super::SpectraFrame;
use crate::error::{FrameError, Result};

impl SpectraFrame {
    /// Same wavelength axis and metadata, new matrix.
    fn with_spc(&self, spc: Array2<f64>) -> SpectraFrame {
        SpectraFrame {
            spc,
            wl: self.wl.clone(),
            data: self.data.clone(),
        }
    }

    /// Apply `f` to every intensity.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> SpectraFrame {
        self.with_spc(self.spc.mapv(f))
    }

    /// Combine with another frame's matrix element by element.
    ///
    /// The right matrix must equal the left shape or broadcast to it (e.g. a
    /// single spectrum against many); otherwise [`FrameError::ShapeMismatch`].
    pub fn try_zip_with(
        &self,
        other: &SpectraFrame,
        f: impl Fn(f64, f64) -> f64,
    ) -> Result<SpectraFrame> {
        let rhs = other
            .spc
            .broadcast(self.spc.dim())
            .ok_or(FrameError::ShapeMismatch {
                left: self.shape(),
                right: other.shape(),
            })?;
        let mut spc = self.spc.clone();
        spc.zip_mut_with(&rhs, |a, &b| *a = f(*a, b));
        Ok(self.with_spc(spc))
    }

    pub fn abs(&self) -> SpectraFrame {
        self.map(f64::abs)
    }

    /// Round to `decimals` places, halves to even. Negative `decimals`
    /// round to tens, hundreds, ...
    pub fn round(&self, decimals: i32) -> SpectraFrame {
        let factor = 10f64.powi(decimals.abs());
        if decimals >= 0 {
            self.map(|v| (v * factor).round_ties_even() / factor)
        } else {
            self.map(|v| (v / factor).round_ties_even() * factor)
        }
    }

    pub fn floor(&self) -> SpectraFrame {
        self.map(f64::floor)
    }

    pub fn ceil(&self) -> SpectraFrame {
        self.map(f64::ceil)
    }

    pub fn trunc(&self) -> SpectraFrame {
        self.map(f64::trunc)
    }
}

// ---------------------------------------------------------------------------
// Operator impls
// ---------------------------------------------------------------------------

/// Frame ⊕ scalar, scalar ⊕ frame and frame ⊕ frame for one operator.
///
/// Frame ⊕ frame panics on incompatible shapes, like ndarray's own
/// operators; use [`SpectraFrame::try_zip_with`] to get an error instead.
macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $op:tt) => {
        impl $trait<f64> for &SpectraFrame {
            type Output = SpectraFrame;

            fn $method(self, rhs: f64) -> SpectraFrame {
                self.map(|v| v $op rhs)
            }
        }

        impl $trait<f64> for SpectraFrame {
            type Output = SpectraFrame;

            fn $method(self, rhs: f64) -> SpectraFrame {
                (&self).$method(rhs)
            }
        }

        impl $trait<&SpectraFrame> for f64 {
            type Output = SpectraFrame;

            fn $method(self, rhs: &SpectraFrame) -> SpectraFrame {
                rhs.map(|v| self $op v)
            }
        }

        impl $trait<SpectraFrame> for f64 {
            type Output = SpectraFrame;

            fn $method(self, rhs: SpectraFrame) -> SpectraFrame {
                self.$method(&rhs)
            }
        }

        impl $trait<&SpectraFrame> for &SpectraFrame {
            type Output = SpectraFrame;

            fn $method(self, rhs: &SpectraFrame) -> SpectraFrame {
                match self.try_zip_with(rhs, |a, b| a $op b) {
                    Ok(frame) => frame,
                    Err(err) => panic!("{err}"),
                }
            }
        }

        impl $trait<SpectraFrame> for SpectraFrame {
            type Output = SpectraFrame;

            fn $method(self, rhs: SpectraFrame) -> SpectraFrame {
                (&self).$method(&rhs)
            }
        }

        impl $trait<&SpectraFrame> for SpectraFrame {
            type Output = SpectraFrame;

            fn $method(self, rhs: &SpectraFrame) -> SpectraFrame {
                (&self).$method(rhs)
            }
        }

        impl $trait<SpectraFrame> for &SpectraFrame {
            type Output = SpectraFrame;

            fn $method(self, rhs: SpectraFrame) -> SpectraFrame {
                self.$method(&rhs)
            }
        }
    };
}

impl_binary_op!(Add, add, +);
impl_binary_op!(Sub, sub, -);
impl_binary_op!(Mul, mul, *);
impl_binary_op!(Div, div, /);

impl Neg for &SpectraFrame {
    type Output = SpectraFrame;

    fn neg(self) -> SpectraFrame {
        self.map(|v| -v)
    }
}

impl Neg for SpectraFrame {
    type Output = SpectraFrame;

    fn neg(self) -> SpectraFrame {
        -&self
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;
    use rstest::rstest;

    use super::*;
    use crate::data::table::MetadataTable;

    fn sf() -> SpectraFrame {
        SpectraFrame::new(
            array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]],
            Some(array![10.0, 20.0, 30.0]),
            Some(MetadataTable::from_series("group", ["A", "B"])),
        )
        .unwrap()
    }

    fn sf2() -> SpectraFrame {
        SpectraFrame::new(
            10.0 * array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]],
            Some(array![1.0, 2.0, 3.0]),
            Some(MetadataTable::from_series("attr", ["A1", "A2"])),
        )
        .unwrap()
    }

    #[derive(Debug, Clone, Copy)]
    enum Op {
        Add,
        Sub,
        Mul,
        Div,
    }

    impl Op {
        fn frames(self, a: &SpectraFrame, b: &SpectraFrame) -> SpectraFrame {
            match self {
                Op::Add => a + b,
                Op::Sub => a - b,
                Op::Mul => a * b,
                Op::Div => a / b,
            }
        }

        fn scalar(self, a: &SpectraFrame, s: f64) -> SpectraFrame {
            match self {
                Op::Add => a + s,
                Op::Sub => a - s,
                Op::Mul => a * s,
                Op::Div => a / s,
            }
        }

        fn reflected(self, s: f64, a: &SpectraFrame) -> SpectraFrame {
            match self {
                Op::Add => s + a,
                Op::Sub => s - a,
                Op::Mul => s * a,
                Op::Div => s / a,
            }
        }

        fn raw(self, x: f64, y: f64) -> f64 {
            match self {
                Op::Add => x + y,
                Op::Sub => x - y,
                Op::Mul => x * y,
                Op::Div => x / y,
            }
        }
    }

    #[rstest]
    fn test_left_right(#[values(Op::Add, Op::Sub, Op::Mul, Op::Div)] op: Op) {
        let sf = sf();
        let sf2 = sf2();
        let before = sf.clone();

        let result = op.scalar(&sf, 10.0);
        assert_eq!(result.spc(), &sf.spc().mapv(|v| op.raw(v, 10.0)));
        assert_eq!(result.wl(), sf.wl());
        assert_eq!(result.data(), sf.data());

        let result = op.reflected(10.0, &sf);
        assert_eq!(result.spc(), &sf.spc().mapv(|v| op.raw(10.0, v)));
        assert_eq!(result.wl(), sf.wl());
        assert_eq!(result.data(), sf.data());

        let result = op.frames(&sf, &sf2);
        let mut expected = sf.spc().clone();
        expected.zip_mut_with(sf2.spc(), |a, &b| *a = op.raw(*a, b));
        assert_eq!(result.spc(), &expected);
        assert_eq!(result.wl(), sf.wl());
        assert_eq!(result.data(), sf.data());

        assert_eq!(sf, before);
    }

    #[test]
    fn test_owned_operands() {
        let result = sf() + sf2();
        assert_eq!(result.spc(), &array![[11.0, 22.0, 33.0], [44.0, 55.0, 66.0]]);
        assert_eq!(result.wl(), &array![10.0, 20.0, 30.0]);

        let result = 1.0 - sf();
        assert_eq!(result.spc(), &array![[0.0, -1.0, -2.0], [-3.0, -4.0, -5.0]]);
    }

    #[test]
    fn test_single_spectrum_broadcasts() {
        let baseline = SpectraFrame::from_spectrum(array![1.0, 1.0, 1.0], None, None).unwrap();
        let result = &sf() - &baseline;
        assert_eq!(result.spc(), &array![[0.0, 1.0, 2.0], [3.0, 4.0, 5.0]]);
        assert_eq!(result.data(), sf().data());
    }

    #[test]
    fn test_shape_mismatch() {
        let narrow = SpectraFrame::new(array![[1.0, 2.0], [3.0, 4.0]], None, None).unwrap();
        let err = sf().try_zip_with(&narrow, |a, b| a + b).unwrap_err();
        assert_eq!(
            err,
            FrameError::ShapeMismatch {
                left: (2, 3),
                right: (2, 2)
            }
        );
    }

    #[test]
    #[should_panic(expected = "cannot be broadcast")]
    fn test_operator_panics_on_shape_mismatch() {
        let narrow = SpectraFrame::new(array![[1.0, 2.0], [3.0, 4.0]], None, None).unwrap();
        let _ = &sf() + &narrow;
    }

    #[test]
    fn test_math() {
        let sf = sf();
        let spc = sf.spc().clone();

        let negated = -1.0 * &sf;
        assert_eq!(negated.abs().spc(), &spc);
        assert_eq!((-&sf).spc(), &spc.mapv(|v| -v));

        let scaled = 0.34 * &sf;
        let rounded = scaled.round(1);
        assert_eq!(rounded.spc(), &array![[0.3, 0.7, 1.0], [1.4, 1.7, 2.0]]);
        assert_eq!(scaled.floor().spc(), &scaled.spc().mapv(f64::floor));
        assert_eq!(scaled.ceil().spc(), &scaled.spc().mapv(f64::ceil));
        assert_eq!(scaled.trunc().spc(), &scaled.spc().mapv(f64::trunc));
        assert_eq!(rounded.data(), sf.data());
    }

    #[test]
    fn test_round_half_to_even() {
        let frame =
            SpectraFrame::from_spectrum(array![0.5, 1.5, 2.5, -0.5, 125.0], None, None).unwrap();
        assert_eq!(frame.round(0).spc(), &array![[0.0, 2.0, 2.0, -0.0, 125.0]]);
        assert_eq!(frame.round(-1).spc(), &array![[0.0, 0.0, 0.0, -0.0, 120.0]]);
    }
}
