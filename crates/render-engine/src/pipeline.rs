//! Render pipeline orchestration.
//!
//! ```text
//! Init ─► Validated ─► Concatenated ─┬─► FinalizedByMove ─┐
//!                                    └─► Muxed ───────────┴─► Done
//! ```
//!
//! Every transition can fail; the first failure ends the run. Stages run
//! strictly one after another and nothing is retried or cleaned up.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use muvidgen_common::error::{MediaKind, MuvidError, MuvidResult};
use muvidgen_project_model::layer::Layer;
use muvidgen_project_model::project::LoadedProject;

use crate::engine::{MediaEngine, Stage};
use crate::filter_graph::{build_layer_graph, LayerGraph};

/// Concat-demuxer list written into the work directory.
pub const CONCAT_LIST_NAME: &str = "concat.txt";

/// Video-only intermediate produced by the concat stage.
pub const CONCAT_OUTPUT_NAME: &str = "concat_video.mp4";

const VIDEO_CODEC: &str = "libx264";
const CONCAT_PRESET: &str = "veryfast";
const CONCAT_CRF: &str = "20";
const PIXEL_FORMAT: &str = "yuv420p";
const AUDIO_CODEC: &str = "aac";
const AUDIO_BITRATE: &str = "192k";

/// Everything the pipeline needs from a project.
#[derive(Debug, Clone)]
pub struct RenderJob {
    /// Clips in concatenation order.
    pub clips: Vec<PathBuf>,

    /// Soundtrack, if any.
    pub audio: Option<PathBuf>,

    /// Overlay layers in stacking order.
    pub layers: Vec<Layer>,

    /// Final output file.
    pub output_path: PathBuf,

    /// Scratch directory for the concat list and intermediate.
    pub work_dir: PathBuf,
}

impl RenderJob {
    pub fn from_project(loaded: &LoadedProject) -> Self {
        Self {
            clips: loaded.project.clip_paths(),
            audio: loaded.project.audio_path(),
            layers: loaded.project.layers().to_vec(),
            output_path: loaded.resolved_output_path(),
            work_dir: loaded.work_dir(),
        }
    }

    /// Whether a second engine pass is needed after concatenation.
    pub fn needs_mux(&self) -> bool {
        self.audio.is_some() || !self.layers.is_empty()
    }
}

/// Pipeline states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderState {
    Init,
    Validated,
    Concatenated { intermediate: PathBuf },
    /// The intermediate was moved into place without re-encoding.
    FinalizedByMove,
    Muxed,
    Done,
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub output_path: PathBuf,

    /// Every state the run passed through, ending with `Done`.
    pub states: Vec<RenderState>,
}

impl RenderOutcome {
    pub fn was_muxed(&self) -> bool {
        self.states.contains(&RenderState::Muxed)
    }
}

/// Drives a [`RenderJob`] through the pipeline states.
pub struct RenderPipeline {
    engine: Arc<dyn MediaEngine>,
    job: RenderJob,
}

impl RenderPipeline {
    pub fn new(engine: Arc<dyn MediaEngine>, job: RenderJob) -> Self {
        Self { engine, job }
    }

    /// Run every stage to completion.
    pub fn run(&self) -> MuvidResult<RenderOutcome> {
        self.resume(RenderState::Init)
    }

    /// Continue a run from `from`, e.g. a state produced by [`Self::advance`].
    pub fn resume(&self, from: RenderState) -> MuvidResult<RenderOutcome> {
        let started = std::time::Instant::now();
        let mut state = from;
        let mut states = vec![state.clone()];

        while state != RenderState::Done {
            state = self.advance(state)?;
            tracing::debug!(state = ?state, "Render state reached");
            states.push(state.clone());
        }

        tracing::info!(
            output = %self.job.output_path.display(),
            elapsed_secs = started.elapsed().as_secs_f64(),
            "Render finished"
        );

        Ok(RenderOutcome {
            output_path: self.job.output_path.clone(),
            states,
        })
    }

    /// Perform the work that leaves `state`, returning the next state.
    pub fn advance(&self, state: RenderState) -> MuvidResult<RenderState> {
        match state {
            RenderState::Init => {
                self.validate()?;
                Ok(RenderState::Validated)
            }
            RenderState::Validated => {
                let intermediate = self.concat()?;
                Ok(RenderState::Concatenated { intermediate })
            }
            RenderState::Concatenated { intermediate } => {
                if self.job.needs_mux() {
                    self.mux(&intermediate)?;
                    Ok(RenderState::Muxed)
                } else {
                    self.finalize_by_move(&intermediate)?;
                    Ok(RenderState::FinalizedByMove)
                }
            }
            RenderState::FinalizedByMove | RenderState::Muxed | RenderState::Done => {
                Ok(RenderState::Done)
            }
        }
    }

    fn validate(&self) -> MuvidResult<()> {
        if self.job.clips.is_empty() {
            return Err(MuvidError::validation(
                "No clips provided; nothing to render.",
            ));
        }

        if !self.engine.is_available() {
            return Err(MuvidError::engine_unavailable(format!(
                "{} not found; set MUVIDGEN_FFMPEG or install it on PATH",
                self.engine.name()
            )));
        }

        for clip in &self.job.clips {
            if !clip.is_file() {
                return Err(MuvidError::MissingMedia {
                    kind: MediaKind::Clip,
                    path: clip.clone(),
                });
            }
        }

        if let Some(audio) = &self.job.audio {
            if !audio.is_file() {
                return Err(MuvidError::MissingMedia {
                    kind: MediaKind::Audio,
                    path: audio.clone(),
                });
            }
        }

        tracing::info!(
            clips = self.job.clips.len(),
            layers = self.job.layers.len(),
            audio = self.job.audio.is_some(),
            "Render job validated"
        );
        Ok(())
    }

    fn concat(&self) -> MuvidResult<PathBuf> {
        std::fs::create_dir_all(&self.job.work_dir)?;

        let list_path = self.job.work_dir.join(CONCAT_LIST_NAME);
        let output_path = self.job.work_dir.join(CONCAT_OUTPUT_NAME);
        write_concat_list(&self.job.clips, &list_path)?;

        let args = concat_args(&list_path, &output_path);
        self.run_stage(Stage::Concat, &args)?;
        Ok(output_path)
    }

    fn mux(&self, intermediate: &Path) -> MuvidResult<()> {
        ensure_parent_dir(&self.job.output_path)?;

        let graph = build_layer_graph(&self.job.layers, self.job.audio.is_some());
        tracing::debug!(
            graph = graph.graph.as_deref().unwrap_or(""),
            video_label = %graph.video_label,
            "Layer graph built"
        );

        let args = mux_args(
            intermediate,
            self.job.audio.as_deref(),
            &graph,
            &self.job.output_path,
        );
        self.run_stage(Stage::Mux, &args)
    }

    fn finalize_by_move(&self, intermediate: &Path) -> MuvidResult<()> {
        let target = &self.job.output_path;
        if absolutize(intermediate) == absolutize(target) {
            return Ok(());
        }

        let moved = ensure_parent_dir(target).and_then(|()| std::fs::rename(intermediate, target));
        moved.map_err(|source| MuvidError::Finalize {
            from: intermediate.to_path_buf(),
            to: target.clone(),
            source,
        })?;

        tracing::info!(output = %target.display(), "Moved concatenated video into place");
        Ok(())
    }

    fn run_stage(&self, stage: Stage, args: &[String]) -> MuvidResult<()> {
        let code = self.engine.run(stage, args)?;
        if code != 0 {
            tracing::error!(stage = %stage, code, "Stage failed");
            return Err(MuvidError::stage_failed(stage.to_string(), code));
        }
        Ok(())
    }
}

/// Engine arguments for the concat stage: re-encode, strip audio.
pub fn concat_args(list_path: &Path, output_path: &Path) -> Vec<String> {
    let list = list_path.display().to_string();
    let output = output_path.display().to_string();

    let mut args = progress_args();
    args.extend(
        [
            "-safe",
            "0",
            "-f",
            "concat",
            "-i",
            list.as_str(),
            "-an",
            "-c:v",
            VIDEO_CODEC,
            "-preset",
            CONCAT_PRESET,
            "-crf",
            CONCAT_CRF,
            "-pix_fmt",
            PIXEL_FORMAT,
            output.as_str(),
        ]
        .map(String::from),
    );
    args
}

/// Engine arguments for the overlay/mux stage.
pub fn mux_args(
    video: &Path,
    audio: Option<&Path>,
    graph: &LayerGraph,
    output_path: &Path,
) -> Vec<String> {
    let mut args = progress_args();
    args.push("-i".to_string());
    args.push(video.display().to_string());

    if let Some(audio) = audio {
        args.push("-i".to_string());
        args.push(audio.display().to_string());
    }

    match &graph.graph {
        Some(filter) => {
            args.push("-filter_complex".to_string());
            args.push(filter.clone());
            args.push("-map".to_string());
            args.push(graph.video_label.to_string());
        }
        None => {
            args.push("-map".to_string());
            args.push("0:v".to_string());
        }
    }

    if audio.is_some() {
        args.push("-map".to_string());
        args.push("1:a".to_string());
    }

    args.extend(["-c:v", VIDEO_CODEC, "-pix_fmt", PIXEL_FORMAT].map(String::from));

    if audio.is_some() {
        args.extend(["-c:a", AUDIO_CODEC, "-b:a", AUDIO_BITRATE, "-shortest"].map(String::from));
    }

    args.push(output_path.display().to_string());
    args
}

fn progress_args() -> Vec<String> {
    ["-hide_banner", "-y", "-nostats", "-progress", "pipe:1"]
        .map(String::from)
        .to_vec()
}

/// Write a concat-demuxer list. Entries are absolute because the demuxer
/// resolves relative entries against the list file's directory.
pub fn write_concat_list(clips: &[PathBuf], list_path: &Path) -> MuvidResult<()> {
    let body: String = clips
        .iter()
        .map(|clip| {
            let path = absolutize(clip).display().to_string();
            format!("file '{}'\n", path.replace('\'', "'\\''"))
        })
        .collect();
    std::fs::write(list_path, body)?;
    Ok(())
}

fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
