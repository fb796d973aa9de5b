// Dataset normalization and the three format encoders (CSV, XLSX, PDF).

pub mod csv;
pub mod meta;
pub mod normalize;
pub mod pdf;
pub mod xlsx;

pub use meta::DocumentMeta;
pub use normalize::{CellValue, Selection, Table, normalize, normalize_selection};
