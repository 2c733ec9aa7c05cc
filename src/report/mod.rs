//! # Report Module
//!
//! Turns worksheets into result records and records into the HTML report:
//! block detection, classification, fixed-column overrides, highlight
//! annotation and rendering, in that order.
pub mod annotate;
pub mod classify;
pub mod detect;
pub mod model;
pub mod overrides;
pub mod render;

pub use model::Discipline;
pub use model::ReportDataset;
pub use model::ResultRecord;
