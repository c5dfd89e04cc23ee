//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::GroveError;

/// Map domain/service errors to a string for CLI output.
pub fn map_error(e: &GroveError) -> String {
    match e {
        GroveError::LockTimeout(path) => format!(
            "Timed out waiting for {}; another grove command may be running",
            path.display()
        ),
        GroveError::Cancelled => "Interrupted".to_string(),
        other => other.to_string(),
    }
}
