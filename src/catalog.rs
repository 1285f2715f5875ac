//! Track catalog: the `Track` value object, boundary validation of loosely
//! typed payloads, and the two catalog suppliers used by the binary (a TOML
//! catalog file and a directory scan).

mod display;
mod load;
mod model;
mod scan;

pub use display::{display_from_fields, make_display};
pub use load::{CatalogError, load_catalog};
pub use model::*;
pub use scan::scan;
