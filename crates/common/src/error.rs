//! Error types shared across MuvidGen crates.

use std::path::PathBuf;

/// Exit code for usage, validation, and missing-resource failures.
pub const EXIT_USAGE: u8 = 2;

/// Exit code for unexpected internal failures.
pub const EXIT_INTERNAL: u8 = 1;

/// Exit code reported when the engine binary could not be spawned at all.
pub const EXIT_SPAWN_FAILED: i32 = 127;

/// Top-level error type for MuvidGen operations.
#[derive(Debug, thiserror::Error)]
pub enum MuvidError {
    #[error("Usage error: {message}")]
    Usage { message: String },

    #[error("Invalid project: {message}")]
    Validation { message: String },

    #[error("Missing {kind}: {}", path.display())]
    MissingMedia { kind: MediaKind, path: PathBuf },

    #[error("Media engine not available: {message}")]
    EngineUnavailable { message: String },

    #[error("{stage} stage failed with code {code}")]
    StageFailed { stage: String, code: i32 },

    #[error("Failed to move {} to {}: {source}", from.display(), to.display())]
    Finalize {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Which kind of referenced media file went missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Clip,
    Audio,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Clip => f.write_str("clip"),
            MediaKind::Audio => f.write_str("audio file"),
        }
    }
}

/// Result type alias using MuvidError.
pub type MuvidResult<T> = Result<T, MuvidError>;

impl MuvidError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage {
            message: msg.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    pub fn engine_unavailable(msg: impl Into<String>) -> Self {
        Self::EngineUnavailable {
            message: msg.into(),
        }
    }

    pub fn stage_failed(stage: impl Into<String>, code: i32) -> Self {
        Self::StageFailed {
            stage: stage.into(),
            code,
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    /// Process exit code for this error.
    ///
    /// Stage failures surface the engine's own code. Codes that cannot be
    /// reported as a process status (zero, negative, above 255) collapse to
    /// the internal-failure code so a failed stage never looks like success.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Usage { .. }
            | Self::Validation { .. }
            | Self::MissingMedia { .. }
            | Self::EngineUnavailable { .. } => EXIT_USAGE,
            Self::StageFailed { code, .. } => match u8::try_from(*code) {
                Ok(0) | Err(_) => EXIT_INTERNAL,
                Ok(code) => code,
            },
            Self::Finalize { .. }
            | Self::Render { .. }
            | Self::Io(_)
            | Self::Other(_) => EXIT_INTERNAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_family_exits_with_usage_code() {
        assert_eq!(MuvidError::usage("bad args").exit_code(), 2);
        assert_eq!(MuvidError::validation("version").exit_code(), 2);
        assert_eq!(MuvidError::engine_unavailable("no ffmpeg").exit_code(), 2);
        let missing = MuvidError::MissingMedia {
            kind: MediaKind::Clip,
            path: PathBuf::from("a.mp4"),
        };
        assert_eq!(missing.exit_code(), 2);
        assert_eq!(missing.to_string(), "Missing clip: a.mp4");
    }

    #[test]
    fn test_stage_failure_propagates_engine_code() {
        assert_eq!(MuvidError::stage_failed("Concat", 69).exit_code(), 69);
        assert_eq!(MuvidError::stage_failed("Mux", 127).exit_code(), 127);
        assert_eq!(
            MuvidError::stage_failed("Mux", 1).to_string(),
            "Mux stage failed with code 1"
        );
    }

    #[test]
    fn test_unreportable_stage_codes_collapse_to_internal() {
        assert_eq!(MuvidError::stage_failed("Concat", -9).exit_code(), 1);
        assert_eq!(MuvidError::stage_failed("Concat", 300).exit_code(), 1);
        assert_eq!(MuvidError::stage_failed("Concat", 0).exit_code(), 1);
    }

    #[test]
    fn test_finalize_failure_is_internal() {
        let err = MuvidError::Finalize {
            from: PathBuf::from("tmp.mp4"),
            to: PathBuf::from("out.mp4"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.exit_code(), 1);
    }
}
