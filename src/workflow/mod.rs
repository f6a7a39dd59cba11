//! Workflow orchestration for one export run.
//!
//! `plan` turns CLI arguments into concrete paths; `export` runs the fixed
//! pipeline and writes the archive.
mod export;
mod plan;

pub use export::run_export;
pub use plan::ExportPlan;
