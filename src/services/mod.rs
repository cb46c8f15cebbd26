//! Service layer for business logic.
//!
//! - `check`: the two-phase fetch and verify pipeline
//! - `import`: identifier extraction from export files
//! - `export`: result persistence

pub mod check;
pub mod export;
pub mod import;

pub use check::{
    silent_log, BatchReport, CancelFlag, CheckConfig, CheckError, CheckPattern, CheckService,
    ProductUrl, ProgressLog,
};
pub use export::{
    default_export_path, write_csv, write_json, write_results, ExportError, ExportFormat,
};
pub use import::{read_identifiers, ImportError, DEFAULT_COLUMN_NEEDLE};
