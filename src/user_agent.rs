//! User-Agent string for archive requests.

const TOOL_NAME: &str = "sheetbridge";

/// Default User-Agent for resource requests (identifies the tool and version).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("{TOOL_NAME}/{version} (archive-harvester)")
}
