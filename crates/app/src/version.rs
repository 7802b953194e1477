use std::fmt;

/// Build metadata captured by the build script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildInfo {
    pub version: &'static str,
    pub repo_version: &'static str,
    pub profile: &'static str,
    pub timestamp: &'static str,
    pub rustc: &'static str,
    pub target: &'static str,
}

impl BuildInfo {
    pub const fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            repo_version: env!("REPO_VERSION"),
            profile: env!("BUILD_PROFILE"),
            timestamp: env!("BUILD_TIMESTAMP"),
            rustc: env!("RUST_VERSION"),
            target: env!("BUILD_TARGET"),
        }
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sealvault {} ({})\n\
             - profile: {}\n\
             - built: {}\n\
             - rustc: {}\n\
             - target: {}",
            self.version, self.repo_version, self.profile, self.timestamp, self.rustc, self.target
        )
    }
}

/// Log build metadata once at startup
pub fn report_build_info() {
    let info = BuildInfo::current();
    tracing::debug!(
        version = info.version,
        repo_version = info.repo_version,
        profile = info.profile,
        target = info.target,
        "build info"
    );
}
