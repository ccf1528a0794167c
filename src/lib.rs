//! Spectra container keeping an intensity matrix, its wavelength axis and a
//! per-spectrum metadata table aligned.
//!
//! ```text
//!   Vec<Spectrum> / Array2 + Array1 + MetadataTable
//!        │
//!        ▼
//!   ┌──────────────┐
//!   │ SpectraFrame │  spc [n_spectra, n_wl], wl [n_wl], data [n_spectra rows]
//!   └──────────────┘
//!     │       │        │
//!     ▼       ▼        ▼
//!   select   ops     apply      each returns a new frame
//! ```

pub mod data;
pub mod error;
pub mod frame;

pub use data::model::{MetadataValue, Spectrum};
pub use data::table::MetadataTable;
pub use error::{FrameError, Result, SelectAxis};
pub use frame::apply::{Arity, NamedReduction, Reduction, SliceOutput};
pub use frame::axis;
pub use frame::select::{IndexMode, Selection, Selector};
pub use frame::SpectraFrame;
