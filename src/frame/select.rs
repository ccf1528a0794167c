//! Three-axis selection over rows, metadata columns and wavelengths.
//!
//! A [`Selection`] carries one [`Selector`] per axis plus an [`IndexMode`].
//! In label mode rows match the metadata index, columns match metadata
//! column names and wavelengths match `wl` values. In positional mode all
//! three take zero-based integer offsets (negative offsets count from the
//! end).
//!
//! Range semantics differ by mode: label ranges include both endpoints,
//! positional ranges are half-open and clipped to the axis.

use std::collections::{HashMap, HashSet};

use ndarray::{Array1, Array2, Axis};

use super::SpectraFrame;
use crate::data::model::MetadataValue;
use crate::error::{FrameError, Result, SelectAxis};

// ---------------------------------------------------------------------------
// Selector / Selection
// ---------------------------------------------------------------------------

/// What to pick along one axis.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Selector {
    /// Every entry, in axis order.
    #[default]
    All,
    /// A single entry; the axis keeps length 1.
    One(MetadataValue),
    /// Explicit entries, in the given order.
    Many(Vec<MetadataValue>),
    /// A contiguous run; `None` leaves that side open.
    Range {
        start: Option<MetadataValue>,
        stop: Option<MetadataValue>,
    },
}

impl Selector {
    pub fn one(key: impl Into<MetadataValue>) -> Self {
        Selector::One(key.into())
    }

    pub fn many<V: Into<MetadataValue>>(keys: impl IntoIterator<Item = V>) -> Self {
        Selector::Many(keys.into_iter().map(Into::into).collect())
    }

    pub fn range(start: impl Into<MetadataValue>, stop: impl Into<MetadataValue>) -> Self {
        Selector::Range {
            start: Some(start.into()),
            stop: Some(stop.into()),
        }
    }

    /// Open-start range ending at `stop`.
    pub fn up_to(stop: impl Into<MetadataValue>) -> Self {
        Selector::Range {
            start: None,
            stop: Some(stop.into()),
        }
    }

    /// Open-end range beginning at `start`.
    pub fn starting_at(start: impl Into<MetadataValue>) -> Self {
        Selector::Range {
            start: Some(start.into()),
            stop: None,
        }
    }
}

/// How selector keys are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexMode {
    /// Keys are row labels, column names and wavelength values.
    #[default]
    Label,
    /// Keys are zero-based integer positions.
    Positional,
}

/// Per-axis selectors and the mode they are resolved in.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Selection {
    pub rows: Selector,
    pub columns: Selector,
    pub wavelengths: Selector,
    pub mode: IndexMode,
}

impl Selection {
    /// Label-based selection of everything; narrow it with the builder methods.
    pub fn label() -> Self {
        Self::default()
    }

    /// Positional selection of everything.
    pub fn positional() -> Self {
        Self {
            mode: IndexMode::Positional,
            ..Self::default()
        }
    }

    pub fn rows(mut self, rows: Selector) -> Self {
        self.rows = rows;
        self
    }

    pub fn columns(mut self, columns: Selector) -> Self {
        self.columns = columns;
        self
    }

    pub fn wavelengths(mut self, wavelengths: Selector) -> Self {
        self.wavelengths = wavelengths;
        self
    }
}

// ---------------------------------------------------------------------------
// SpectraFrame entry points
// ---------------------------------------------------------------------------

impl SpectraFrame {
    /// Subset matrix, wavelength axis and metadata together.
    ///
    /// The row set picks matrix and metadata rows, the wavelength set picks
    /// matrix columns and `wl` entries, and the column set only projects the
    /// metadata table.
    ///
    /// # Errors
    ///
    /// * [`FrameError::LabelNotFound`] for a label absent from its axis
    /// * [`FrameError::PositionOutOfBounds`] for a positional key past either end
    /// * [`FrameError::InvalidSelector`] for keys of the wrong kind, or an
    ///   entry picked twice
    pub fn select(&self, selection: &Selection) -> Result<SpectraFrame> {
        let (rows, cols, wls) = match selection.mode {
            IndexMode::Label => {
                let column_labels: Vec<MetadataValue> = self
                    .data
                    .columns()
                    .iter()
                    .map(|c| MetadataValue::from(c.as_str()))
                    .collect();
                (
                    resolve_labels(&selection.rows, self.data.index(), SelectAxis::Rows)?,
                    resolve_labels(&selection.columns, &column_labels, SelectAxis::Columns)?,
                    resolve_wavelengths(&selection.wavelengths, &self.wl)?,
                )
            }
            IndexMode::Positional => (
                resolve_positions(&selection.rows, self.nspc(), SelectAxis::Rows)?,
                resolve_positions(&selection.columns, self.data.n_cols(), SelectAxis::Columns)?,
                resolve_positions(&selection.wavelengths, self.nwl(), SelectAxis::Wavelengths)?,
            ),
        };
        ensure_distinct(&rows, SelectAxis::Rows)?;
        ensure_distinct(&cols, SelectAxis::Columns)?;
        ensure_distinct(&wls, SelectAxis::Wavelengths)?;

        log::debug!(
            "{:?} selection: {} rows, {} columns, {} wavelengths",
            selection.mode,
            rows.len(),
            cols.len(),
            wls.len()
        );
        Ok(self.take(&rows, &cols, &wls))
    }

    /// Label-based [`select`](Self::select).
    pub fn loc(
        &self,
        rows: Selector,
        columns: Selector,
        wavelengths: Selector,
    ) -> Result<SpectraFrame> {
        self.select(&Selection::label().rows(rows).columns(columns).wavelengths(wavelengths))
    }

    /// Positional [`select`](Self::select).
    pub fn iloc(
        &self,
        rows: Selector,
        columns: Selector,
        wavelengths: Selector,
    ) -> Result<SpectraFrame> {
        self.select(
            &Selection::positional()
                .rows(rows)
                .columns(columns)
                .wavelengths(wavelengths),
        )
    }

    /// Copy out the given positions. Positions must already be in bounds.
    pub(crate) fn take(&self, rows: &[usize], cols: &[usize], wls: &[usize]) -> SpectraFrame {
        let spc = if rows.is_empty() || wls.is_empty() {
            Array2::zeros((rows.len(), wls.len()))
        } else {
            self.spc.select(Axis(0), rows).select(Axis(1), wls)
        };
        let wl = if wls.is_empty() {
            Array1::zeros(0)
        } else {
            self.wl.select(Axis(0), wls)
        };
        SpectraFrame {
            spc,
            wl,
            data: self.data.take(rows, cols),
        }
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Resolve a selector against row labels or column names.
///
/// Labels and keys are compared through [`MetadataValue::label_key`], so an
/// integral float and the equal integer name the same entry.
fn resolve_labels(
    selector: &Selector,
    labels: &[MetadataValue],
    axis: SelectAxis,
) -> Result<Vec<usize>> {
    let label_keys: Vec<MetadataValue> = labels.iter().map(MetadataValue::label_key).collect();
    let lookup: HashMap<&MetadataValue, usize> =
        label_keys.iter().enumerate().map(|(i, k)| (k, i)).collect();
    let locate = |key: &MetadataValue| {
        lookup
            .get(&key.label_key())
            .copied()
            .ok_or_else(|| FrameError::LabelNotFound {
                axis,
                label: key.to_string(),
            })
    };

    let positions = match selector {
        Selector::All => (0..labels.len()).collect(),
        Selector::One(key) => vec![locate(key)?],
        Selector::Many(keys) => keys.iter().map(locate).collect::<Result<_>>()?,
        Selector::Range { start, stop } => {
            let monotonic = label_keys.windows(2).all(|pair| pair[0] <= pair[1]);
            // An endpoint missing from the axis can only be placed on a sorted axis.
            let bound = |key: &MetadataValue, inclusive_end: bool| -> Result<usize> {
                let target = key.label_key();
                match (lookup.get(&target), monotonic) {
                    (Some(&pos), _) => Ok(if inclusive_end { pos + 1 } else { pos }),
                    (None, true) if inclusive_end => Ok(label_keys.partition_point(|k| *k <= target)),
                    (None, true) => Ok(label_keys.partition_point(|k| *k < target)),
                    (None, false) => locate(key),
                }
            };
            let lo = start.as_ref().map_or(Ok(0), |k| bound(k, false))?;
            let hi = stop.as_ref().map_or(Ok(labels.len()), |k| bound(k, true))?;
            (lo..hi.max(lo)).collect()
        }
    };
    log::trace!("{axis} by label {selector:?} -> {positions:?}");
    Ok(positions)
}

/// Resolve a selector against wavelength values.
///
/// Ranges keep every wavelength inside the closed interval, in axis order, so
/// endpoints between two wavelengths snap inwards.
fn resolve_wavelengths(selector: &Selector, wl: &Array1<f64>) -> Result<Vec<usize>> {
    let axis = SelectAxis::Wavelengths;
    let value = |key: &MetadataValue| {
        key.as_f64().ok_or_else(|| FrameError::InvalidSelector {
            axis,
            reason: format!("wavelength label '{key}' is not numeric"),
        })
    };
    let locate = |key: &MetadataValue| -> Result<usize> {
        let target = value(key)?;
        wl.iter()
            .position(|&w| w == target)
            .ok_or_else(|| FrameError::LabelNotFound {
                axis,
                label: key.to_string(),
            })
    };

    let positions = match selector {
        Selector::All => (0..wl.len()).collect(),
        Selector::One(key) => vec![locate(key)?],
        Selector::Many(keys) => keys.iter().map(locate).collect::<Result<_>>()?,
        Selector::Range { start, stop } => {
            let lo = start.as_ref().map_or(Ok(f64::NEG_INFINITY), value)?;
            let hi = stop.as_ref().map_or(Ok(f64::INFINITY), value)?;
            wl.iter()
                .enumerate()
                .filter(|&(_, &w)| lo <= w && w <= hi)
                .map(|(i, _)| i)
                .collect()
        }
    };
    log::trace!("wavelengths by label {selector:?} -> {positions:?}");
    Ok(positions)
}

/// Resolve a selector of integer positions against an axis of length `len`.
fn resolve_positions(selector: &Selector, len: usize, axis: SelectAxis) -> Result<Vec<usize>> {
    let offset = |key: &MetadataValue| {
        key.as_i64().ok_or_else(|| FrameError::InvalidSelector {
            axis,
            reason: format!("positional key '{key}' is not an integer"),
        })
    };
    let n = len as i64;
    let locate = |key: &MetadataValue| -> Result<usize> {
        let position = offset(key)?;
        let wrapped = if position < 0 { position + n } else { position };
        if (0..n).contains(&wrapped) {
            Ok(wrapped as usize)
        } else {
            Err(FrameError::PositionOutOfBounds {
                axis,
                position,
                len,
            })
        }
    };
    let clip = |position: i64| -> usize {
        let wrapped = if position < 0 { position + n } else { position };
        wrapped.clamp(0, n) as usize
    };

    let positions = match selector {
        Selector::All => (0..len).collect(),
        Selector::One(key) => vec![locate(key)?],
        Selector::Many(keys) => keys.iter().map(locate).collect::<Result<_>>()?,
        Selector::Range { start, stop } => {
            let lo = match start {
                Some(k) => clip(offset(k)?),
                None => 0,
            };
            let hi = match stop {
                Some(k) => clip(offset(k)?),
                None => len,
            };
            (lo..hi.max(lo)).collect()
        }
    };
    log::trace!("{axis} by position {selector:?} -> {positions:?}");
    Ok(positions)
}

/// A repeated row or wavelength would break label uniqueness downstream.
fn ensure_distinct(positions: &[usize], axis: SelectAxis) -> Result<()> {
    let mut seen = HashSet::with_capacity(positions.len());
    match positions.iter().find(|p| !seen.insert(**p)) {
        Some(p) => Err(FrameError::InvalidSelector {
            axis,
            reason: format!("position {p} selected more than once"),
        }),
        None => Ok(()),
    }
}
