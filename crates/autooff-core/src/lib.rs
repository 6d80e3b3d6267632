pub mod automation;
pub mod dom;
pub mod error;
pub mod progress;
pub mod report;
pub mod settings;
pub mod timing;

pub use automation::{RunOptions, Session};
pub use error::{Error, Result};
pub use progress::{CancelFlag, ProgressSink};
pub use report::{RunMetrics, RunReport, SwitchState, ToggleMethod, ToggleOutcome};
pub use timing::Timing;
