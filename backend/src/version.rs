//! Build metadata captured at compile time

/// Package version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Commit hash of the build, `none` when not provided
pub const COMMIT: &str = match option_env!("GIT_REV") {
    Some(rev) => rev,
    None => "none",
};

/// Build timestamp, `unknown` when not provided
pub const BUILD_TIME: &str = match option_env!("BUILD_TIME") {
    Some(time) => time,
    None => "unknown",
};

/// One-line version banner printed by `--version`
#[must_use]
pub fn banner() -> String {
    format!("sqs-ui {VERSION} (commit {COMMIT}, built {BUILD_TIME})")
}
