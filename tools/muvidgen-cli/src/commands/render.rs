//! Render a project file.

use std::path::PathBuf;
use std::sync::Arc;

use muvidgen_common::error::{MuvidError, MuvidResult};
use muvidgen_common::tools::ToolPaths;
use muvidgen_project_model::project::{LoadedProject, ProjectError};
use muvidgen_render_engine::duration::estimate_total_duration_ms;
use muvidgen_render_engine::engine::{FfmpegEngine, MediaEngine};
use muvidgen_render_engine::pipeline::{RenderJob, RenderPipeline, RenderState};

pub async fn run(path: PathBuf) -> MuvidResult<()> {
    if !path.is_file() {
        return Err(MuvidError::usage(format!(
            "Project JSON not found: {}",
            path.display()
        )));
    }

    let loaded = LoadedProject::load(&path).map_err(invalid_project)?;
    loaded.project.validate().map_err(invalid_project)?;

    let job = RenderJob::from_project(&loaded);
    print_summary(&loaded, &job);

    if loaded.project.output_path().is_none() && !job.clips.is_empty() {
        println!(
            "[renderer] No output specified; defaulting to {}",
            job.output_path.display()
        );
    }

    let tools = ToolPaths::from_env();
    tracing::debug!(
        ffmpeg = %tools.ffmpeg.display(),
        ffprobe = %tools.ffprobe.display(),
        "Resolved media tools"
    );
    let engine: Arc<dyn MediaEngine> = Arc::new(
        FfmpegEngine::new(tools).with_output(Arc::new(|line: &str| println!("{line}"))),
    );

    let clips = job.clips.clone();
    let pipeline = Arc::new(RenderPipeline::new(Arc::clone(&engine), job));

    let preflight = Arc::clone(&pipeline);
    let validated = blocking(move || preflight.advance(RenderState::Init)).await?;

    let total_ms = estimate_total_duration_ms(engine, &clips).await;
    if total_ms > 0 {
        println!("total_duration_ms={total_ms}");
    }

    let outcome = blocking(move || pipeline.resume(validated)).await?;

    println!("[renderer] Render complete: {}", outcome.output_path.display());
    Ok(())
}

fn print_summary(loaded: &LoadedProject, job: &RenderJob) {
    println!("[renderer] Loaded project");
    println!(
        "  audio: {}",
        job.audio
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "none".to_string())
    );
    println!("  clips: {}", job.clips.len());
    for (idx, clip) in job.clips.iter().enumerate() {
        println!("    - index={idx} path={}", clip.display());
    }
    println!(
        "  output: {}",
        loaded
            .project
            .output_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(not specified)".to_string())
    );
    println!("  layers: {}", job.layers.len());
}

/// Pipeline steps spawn processes and touch the filesystem.
async fn blocking<T, F>(step: F) -> MuvidResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> MuvidResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(step)
        .await
        .map_err(|e| MuvidError::Other(anyhow::anyhow!("render task failed: {e}")))?
}

fn invalid_project(err: ProjectError) -> MuvidError {
    match err {
        ProjectError::ValidationError { message } => MuvidError::validation(message),
        other => MuvidError::validation(other.to_string()),
    }
}
