//! `lc-export` -- marker report writers and the batch export pipeline.
//!
//! - [`csv`]: tab-delimited UTF-16LE marker reports.
//! - [`html`]: user-template HTML reports with thumbnail references.
//! - [`batch`]: fan-out completion tracking and the shared abort flag.
//! - [`pipeline`]: the worker thread that exports a list of assets.

pub mod batch;
pub mod csv;
pub mod error;
pub mod html;
pub mod pipeline;

pub use batch::{AbortFlag, BatchJoin, BatchSummary};
pub use csv::{write_marker_csv, MarkerRow};
pub use error::{ExportError, ExportResult};
pub use html::{thumbnail_relative_path, HtmlTemplate, ThumbnailFormat};
pub use pipeline::{
    ExportAsset, ExportEvent, ExportFormat, ExportJob, ExportPipeline, ThumbnailSource,
};
