//! The aligned spectra container.
//!
//! A [`SpectraFrame`] keeps three entities in lock-step:
//!
//! - `spc`: intensity matrix, shape `[n_spectra, n_wavelengths]`
//! - `wl`: wavelength axis, one label per matrix column
//! - `data`: metadata table, one row per matrix row
//!
//! Every operation (selection, arithmetic, apply) returns a new frame with its
//! own buffers; no operation mutates an existing frame.

pub mod apply;
pub mod ops;
pub mod select;


use std::collections::BTreeSet;
use std::fmt;

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::data::model::{MetadataValue, Spectrum};
use crate::data::table::{range_index, MetadataTable};
use crate::error::{FrameError, Result};

/// Semantic axis constants for [`SpectraFrame::apply`].
///
/// `ROWS` and `COLS` name the matrix axis that is reduced away, as in
/// `ndarray`: `ROWS` yields one result per wavelength, `COLS` one per spectrum.
pub mod axis {
    use ndarray::Axis;

    /// Reduce across spectra: the function sees one column (wavelength) at a time.
    pub const ROWS: Axis = Axis(0);
    /// Reduce across wavelengths: the function sees one spectrum at a time.
    pub const COLS: Axis = Axis(1);
}

// ---------------------------------------------------------------------------
// SpectraFrame
// ---------------------------------------------------------------------------

/// Intensity matrix, wavelength axis and metadata table, kept aligned.
///
/// Built with [`SpectraFrame::new`] and its siblings, which reject
/// misaligned parts; every other operation returns a new frame.
///
/// # Panics
///
/// The frame ⊕ frame operators (`&a + &b`, ...) panic when the right matrix
/// does not broadcast to the left shape. Use
/// [`try_zip_with`](SpectraFrame::try_zip_with) to get a
/// [`FrameError::ShapeMismatch`] instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FrameParts")]
pub struct SpectraFrame {
    spc: Array2<f64>,
    wl: Array1<f64>,
    data: MetadataTable,
}

/// Unvalidated wire form; deserialisation goes through [`SpectraFrame::new`].
#[derive(Deserialize)]
struct FrameParts {
    spc: Array2<f64>,
    wl: Array1<f64>,
    data: MetadataTable,
}

impl TryFrom<FrameParts> for SpectraFrame {
    type Error = FrameError;

    fn try_from(parts: FrameParts) -> Result<Self> {
        SpectraFrame::new(parts.spc, Some(parts.wl), Some(parts.data))
    }
}

/// Default wavelength axis `0..n`.
pub(crate) fn default_wl(n: usize) -> Array1<f64> {
    Array1::from_iter((0..n).map(|i| i as f64))
}

impl SpectraFrame {
    /// Build a frame from a matrix and optional wavelength axis and metadata.
    ///
    /// A missing `wl` defaults to `0..n_wavelengths`; missing `data` defaults
    /// to a table without columns whose index is `0..n_spectra`.
    ///
    /// # Errors
    ///
    /// * [`FrameError::WavelengthLenMismatch`] if `wl` does not have one value per column
    /// * [`FrameError::MetadataRowMismatch`] if `data` does not have one row per spectrum
    /// * [`FrameError::DuplicateWavelength`] if a wavelength repeats or is NaN
    pub fn new(
        spc: Array2<f64>,
        wl: Option<Array1<f64>>,
        data: Option<MetadataTable>,
    ) -> Result<Self> {
        let (n_rows, n_cols) = spc.dim();
        let wl = wl.unwrap_or_else(|| default_wl(n_cols));
        if wl.len() != n_cols {
            return Err(FrameError::WavelengthLenMismatch {
                expected: n_cols,
                got: wl.len(),
            });
        }
        check_unique_wavelengths(&wl)?;

        let data = data.unwrap_or_else(|| MetadataTable::empty(n_rows));
        if data.n_rows() != n_rows {
            return Err(FrameError::MetadataRowMismatch {
                expected: n_rows,
                got: data.n_rows(),
            });
        }

        log::debug!(
            "built frame: {n_rows} spectra x {n_cols} wavelengths, {} metadata columns",
            data.n_cols()
        );
        Ok(Self { spc, wl, data })
    }

    /// Build a single-spectrum frame; the 1D input becomes one matrix row.
    pub fn from_spectrum(
        spc: Array1<f64>,
        wl: Option<Array1<f64>>,
        data: Option<MetadataTable>,
    ) -> Result<Self> {
        Self::new(spc.insert_axis(Axis(0)), wl, data)
    }

    /// Build from nested rows, each holding one spectrum.
    pub fn from_rows(
        rows: &[Vec<f64>],
        wl: Option<Array1<f64>>,
        data: Option<MetadataTable>,
    ) -> Result<Self> {
        let n_cols = rows.first().map_or(0, Vec::len);
        if let Some((row, values)) = rows.iter().enumerate().find(|(_, v)| v.len() != n_cols) {
            return Err(FrameError::RaggedRows {
                row,
                expected: n_cols,
                got: values.len(),
            });
        }
        let spc = Array2::from_shape_fn((rows.len(), n_cols), |(r, c)| rows[r][c]);
        Self::new(spc, wl, data)
    }

    /// Build from row-oriented records sharing one wavelength axis.
    ///
    /// Metadata columns are the sorted union of every record's keys; a record
    /// lacking a key gets `Null` in that column.
    pub fn from_spectra(spectra: Vec<Spectrum>) -> Result<Self> {
        let Some(first) = spectra.first() else {
            return Self::new(Array2::zeros((0, 0)), None, None);
        };
        let wl = Array1::from_vec(first.x.clone());
        let n_cols = wl.len();

        let mut column_names: BTreeSet<&str> = BTreeSet::new();
        for (index, sp) in spectra.iter().enumerate() {
            if sp.y.len() != sp.x.len() {
                return Err(FrameError::RaggedRows {
                    row: index,
                    expected: sp.x.len(),
                    got: sp.y.len(),
                });
            }
            if sp.x != first.x {
                return Err(FrameError::SpectrumAxisMismatch { index });
            }
            column_names.extend(sp.metadata.keys().map(String::as_str));
        }

        let columns: Vec<String> = column_names.iter().map(|c| c.to_string()).collect();
        let cells = column_names
            .iter()
            .map(|col| {
                spectra
                    .iter()
                    .map(|sp| sp.metadata.get(*col).cloned().unwrap_or(MetadataValue::Null))
                    .collect()
            })
            .collect();
        let data = MetadataTable::new(range_index(spectra.len()), columns, cells)?;

        let spc = Array2::from_shape_fn((spectra.len(), n_cols), |(r, c)| spectra[r].y[c]);
        Self::new(spc, Some(wl), Some(data))
    }

    /// Row-oriented records, one per spectrum. Row labels are not carried.
    pub fn to_spectra(&self) -> Vec<Spectrum> {
        let x = self.wl.to_vec();
        self.spc
            .outer_iter()
            .enumerate()
            .map(|(row, y)| Spectrum {
                x: x.clone(),
                y: y.to_vec(),
                metadata: self.data.row(row).unwrap_or_default(),
            })
            .collect()
    }

    // -- Accessors --

    /// Intensity matrix, `[n_spectra, n_wavelengths]`.
    pub fn spc(&self) -> &Array2<f64> {
        &self.spc
    }

    /// Wavelength axis.
    pub fn wl(&self) -> &Array1<f64> {
        &self.wl
    }

    /// Metadata table.
    pub fn data(&self) -> &MetadataTable {
        &self.data
    }

    /// Number of spectra.
    pub fn nspc(&self) -> usize {
        self.spc.nrows()
    }

    /// Number of wavelengths.
    pub fn nwl(&self) -> usize {
        self.spc.ncols()
    }

    /// Matrix shape `(n_spectra, n_wavelengths)`.
    pub fn shape(&self) -> (usize, usize) {
        self.spc.dim()
    }

    pub fn is_empty(&self) -> bool {
        self.spc.is_empty()
    }

    pub fn into_parts(self) -> (Array2<f64>, Array1<f64>, MetadataTable) {
        (self.spc, self.wl, self.data)
    }
}

impl fmt::Display for SpectraFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (n_rows, n_cols) = self.shape();
        write!(
            f,
            "SpectraFrame: {n_rows} spectra x {n_cols} wavelengths, {} metadata columns",
            self.data.n_cols()
        )?;
        if n_cols > 0 {
            write!(f, " (wl {}..{})", self.wl[0], self.wl[n_cols - 1])?;
        }
        Ok(())
    }
}

/// Wavelengths are matched by equality, so they must be unique and comparable.
fn check_unique_wavelengths(wl: &Array1<f64>) -> Result<()> {
    if let Some(nan) = wl.iter().find(|w| w.is_nan()) {
        return Err(FrameError::DuplicateWavelength(*nan));
    }
    let mut sorted = wl.to_vec();
    sorted.sort_by(f64::total_cmp);
    match sorted.windows(2).find(|pair| pair[0] == pair[1]) {
        Some(pair) => Err(FrameError::DuplicateWavelength(pair[0])),
        None => Ok(()),
    }
}
