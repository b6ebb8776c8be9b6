//! Project file types.
//!
//! A project is a single JSON document listing the clips to concatenate,
//! an optional soundtrack, an optional output path, and overlay layers.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use crate::layer::Layer;

/// The only project schema version this renderer understands.
pub const SUPPORTED_VERSION: &str = "1.0";

/// Top-level project file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Project {
    /// Schema version.
    pub version: Option<String>,

    /// Clips in concatenation order.
    pub clips: Option<Vec<Clip>>,

    /// Soundtrack muxed under the video.
    pub audio: Option<MediaRef>,

    /// Where to write the rendered file.
    pub output: Option<MediaRef>,

    /// Overlay layers in stacking order.
    pub layers: Option<Vec<Layer>>,
}

/// One source video clip.
///
/// Entries that are not objects, or whose `path` is not a string, parse as
/// a clip without a path and are skipped by [`Project::clip_paths`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Clip {
    pub path: Option<String>,
}

impl<'de> Deserialize<'de> for Clip {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        let path = value
            .get("path")
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned);
        Ok(Self { path })
    }
}

/// Reference to a media file on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaRef {
    pub path: Option<String>,
}

impl MediaRef {
    fn non_empty_path(&self) -> Option<&str> {
        self.path.as_deref().filter(|p| !p.is_empty())
    }
}

impl Project {
    /// Check the schema version and the presence of a clip list.
    pub fn validate(&self) -> Result<(), ProjectError> {
        if self.version.as_deref() != Some(SUPPORTED_VERSION) {
            return Err(ProjectError::ValidationError {
                message: format!(
                    "Unsupported or missing project version; expected '{SUPPORTED_VERSION}'."
                ),
            });
        }
        if self.clips.is_none() {
            return Err(ProjectError::ValidationError {
                message: "Project missing 'clips' list.".to_string(),
            });
        }
        Ok(())
    }

    /// Clip paths in order. Entries without a path are skipped.
    pub fn clip_paths(&self) -> Vec<PathBuf> {
        self.clips
            .iter()
            .flatten()
            .filter_map(|clip| clip.path.as_deref().filter(|p| !p.is_empty()))
            .map(PathBuf::from)
            .collect()
    }

    pub fn audio_path(&self) -> Option<PathBuf> {
        self.audio
            .as_ref()
            .and_then(MediaRef::non_empty_path)
            .map(PathBuf::from)
    }

    pub fn output_path(&self) -> Option<PathBuf> {
        self.output
            .as_ref()
            .and_then(MediaRef::non_empty_path)
            .map(PathBuf::from)
    }

    pub fn layers(&self) -> &[Layer] {
        self.layers.as_deref().unwrap_or_default()
    }
}

/// A project together with the file it was read from.
#[derive(Debug, Clone)]
pub struct LoadedProject {
    /// Path of the project JSON file.
    pub path: PathBuf,

    /// Parsed project contents.
    pub project: Project,
}

impl LoadedProject {
    /// Read and parse a project file. Does not validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let path = path.as_ref().to_path_buf();

        let json = std::fs::read_to_string(&path).map_err(|e| ProjectError::IoError {
            path: path.clone(),
            source: e,
        })?;

        let project: Project =
            serde_json::from_str(&json).map_err(|e| ProjectError::ParseError {
                path: path.clone(),
                source: e,
            })?;

        Ok(Self { path, project })
    }

    /// Output from the project, or `<project path without extension>_render.mp4`.
    pub fn resolved_output_path(&self) -> PathBuf {
        self.project
            .output_path()
            .unwrap_or_else(|| self.default_output_path())
    }

    pub fn default_output_path(&self) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".to_string());
        self.path.with_file_name(format!("{stem}_render.mp4"))
    }

    /// Scratch directory for intermediates, next to the project file.
    pub fn work_dir(&self) -> PathBuf {
        self.path
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(".muvidgen")
            .join("muvidgen")
    }
}

/// Errors that can occur when working with projects.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid project: {message}")]
    ValidationError { message: String },
}
