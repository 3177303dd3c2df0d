//! Multi-group cross sections for ANT-MOC materials
//!
//! A [Material] holds named cross-section arrays over `ngroups` energy
//! groups. The names understood by ANT-MOC are listed in [XS_NAMES]; the
//! `scatter matrix` holds `ngroups * ngroups` values per Legendre order, with
//! row `g` giving scattering out of group `g`.
//!
//! A [MaterialLibrary] is a set of materials sharing one group structure,
//! stored as a JSON document or in the `materials.xml` layout (files ending
//! in `.xml`):
//!
//! ```json
//! {
//!   "ngroups": 2,
//!   "materials": [
//!     {
//!       "name": "UO2",
//!       "info": "fuel",
//!       "data": {
//!         "absorption": [0.01, 0.1],
//!         "transport": [0.2, 0.9],
//!         "scatter matrix": [0.15, 0.02, 0.0, 0.7]
//!       }
//!     }
//!   ]
//! }
//! ```
//!
//! The library can report suspicious data and fix the usual inconsistencies
//! between `total`/`transport`, `absorption`, and the scatter matrix.

mod library;
mod material;
mod xml;

#[doc(inline)]
pub use library::{Fix, MaterialLibrary, NegativeXs, SigmaTDeficit, SigmaTReport};

#[doc(inline)]
pub use material::{Material, XS_NAMES};

// standard library
use std::path::PathBuf;

// external crates
use thiserror::Error;

/// Invalid cross-section data or library I/O failure
#[derive(Debug, Error)]
pub enum MgxsError {
    /// Not one of [XS_NAMES]
    #[error("undefined cross-section name '{0}'")]
    UnknownXs(String),

    /// An array needed for an operation is not defined
    #[error("material '{material}' has no '{xs}' array")]
    MissingXs { material: String, xs: String },

    /// An array does not fit the number of groups
    #[error("array '{xs}' of material '{material}' has {found} value(s), expected {expected}")]
    Length {
        material: String,
        xs: String,
        expected: String,
        found: usize,
    },

    /// Materials of one library must share the group structure
    #[error("material '{material}' has {found} group(s), the library has {ngroups}")]
    GroupMismatch {
        material: String,
        ngroups: usize,
        found: usize,
    },

    /// Material names must be unique within a library
    #[error("material '{0}' is defined more than once")]
    Duplicate(String),

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("material library is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("material library is not valid XML: {0}")]
    Xml(String),
}
