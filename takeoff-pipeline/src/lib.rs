pub mod driver;
pub mod errors;
pub mod inputs;
pub mod report;
pub mod stages;
pub mod toolkit;

pub use driver::{Pipeline, RunSummary, STAGE_ORDER, StageOutcome, stage_by_name};
pub use errors::{ErrorKind, PipelineError};
pub use stages::{FileFailure, Stage, StageContext, StageReport};
pub use toolkit::Toolkit;
