//! Output rendering (provenance report)

pub mod report;

pub use report::{render_report, ReportOptions, BANNER_WIDTH};
