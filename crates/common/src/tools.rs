//! External tool discovery.
//!
//! The renderer shells out to ffmpeg for both pipeline stages and to
//! ffprobe for duration estimates. Both locations are resolved once at
//! startup and passed explicitly to whatever needs them.

use std::path::{Path, PathBuf};

/// Environment variable overriding the ffmpeg binary.
pub const FFMPEG_ENV: &str = "MUVIDGEN_FFMPEG";

/// Environment variable overriding the ffprobe binary.
pub const FFPROBE_ENV: &str = "MUVIDGEN_FFPROBE";

/// Resolved locations of the external media tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    /// Media engine used for concat and mux stages.
    pub ffmpeg: PathBuf,

    /// Probe used for per-clip duration estimates.
    pub ffprobe: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

impl ToolPaths {
    /// Resolve tool paths from the process environment.
    pub fn from_env() -> Self {
        Self::resolve(|key| std::env::var(key).ok())
    }

    /// Resolve tool paths using `lookup` for environment variables.
    ///
    /// ffprobe resolution order: explicit override, then a sibling of an
    /// ffmpeg path that names a directory, then a bare PATH lookup.
    pub fn resolve(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let ffmpeg = lookup(FFMPEG_ENV)
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.ffmpeg);

        let ffprobe = lookup(FFPROBE_ENV)
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .or_else(|| sibling_ffprobe(&ffmpeg))
            .unwrap_or(defaults.ffprobe);

        Self { ffmpeg, ffprobe }
    }
}

fn sibling_ffprobe(ffmpeg: &Path) -> Option<PathBuf> {
    // A bare "ffmpeg" has an empty parent; that means PATH lookup, not a sibling.
    let dir = ffmpeg.parent().filter(|dir| !dir.as_os_str().is_empty())?;

    if cfg!(windows) {
        let exe = dir.join("ffprobe.exe");
        if exe.is_file() {
            return Some(exe);
        }
    }

    let candidate = dir.join("ffprobe");
    candidate.is_file().then_some(candidate)
}
