pub mod checks;
pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod report;
pub mod source;
pub mod util;

use std::path::Path;

use chrono::NaiveDate;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::EngineError;
pub use report::model::{Finding, Level, Report, Status, ToolInfo};

pub const TOOL_NAME: &str = "lilos";

/// JSON schema version of lilos reports.
/// This must be bumped only when the report shape changes semantically.
pub const SCHEMA_VERSION: &str = "0.1.0";

/// Run the full battery over the governance sources under `root`.
pub fn validate(
    root: &Path,
    config: &EngineConfig,
    today: NaiveDate,
    tool: ToolInfo,
) -> Result<Report, EngineError> {
    Engine::new(config.clone())?.check(root, today, tool)
}
