//! External media engine adapter.
//!
//! Every render stage is one ffmpeg invocation. The [`MediaEngine`] trait is
//! the seam between the pipeline and the subprocess so the pipeline can run
//! against a scripted engine in tests.

use std::fmt;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;

use muvidgen_common::error::{MuvidError, MuvidResult, EXIT_SPAWN_FAILED};
use muvidgen_common::tools::ToolPaths;

/// Pipeline stage an engine invocation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Join all clips into one video-only intermediate.
    Concat,
    /// Apply overlays and mux the soundtrack.
    Mux,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Concat => f.write_str("Concat"),
            Stage::Mux => f.write_str("Mux"),
        }
    }
}

/// Receives every line of engine output as it arrives.
pub type OutputSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Trait for media engines (ffmpeg, or a scripted stand-in).
pub trait MediaEngine: Send + Sync {
    /// Run one stage to completion and return the process exit code.
    ///
    /// Failing to launch the process is reported as a non-zero code, not
    /// as an error; errors are reserved for losing track of a process that
    /// did start.
    fn run(&self, stage: Stage, args: &[String]) -> MuvidResult<i32>;

    /// Container duration of `path` in seconds, if it can be determined.
    fn probe_duration_secs(&self, path: &Path) -> Option<f64>;

    /// Check if the engine can be launched.
    fn is_available(&self) -> bool;

    /// Engine name.
    fn name(&self) -> &str;
}

/// ffmpeg/ffprobe subprocess engine.
pub struct FfmpegEngine {
    tools: ToolPaths,
    output: OutputSink,
}

impl FfmpegEngine {
    pub fn new(tools: ToolPaths) -> Self {
        Self {
            tools,
            output: Arc::new(|line| tracing::debug!(target: "ffmpeg", "{line}")),
        }
    }

    /// Echo engine output (and the command line) through `sink`.
    pub fn with_output(mut self, sink: OutputSink) -> Self {
        self.output = sink;
        self
    }
}

impl fmt::Debug for FfmpegEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FfmpegEngine")
            .field("tools", &self.tools)
            .finish_non_exhaustive()
    }
}

impl MediaEngine for FfmpegEngine {
    fn run(&self, stage: Stage, args: &[String]) -> MuvidResult<i32> {
        (self.output)(&format!(
            "[ffmpeg] {}",
            format_command_line(&self.tools.ffmpeg, args)
        ));
        tracing::debug!(stage = %stage, args = ?args, "Running ffmpeg");

        let mut child = match Command::new(&self.tools.ffmpeg)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                tracing::error!(
                    stage = %stage,
                    ffmpeg = %self.tools.ffmpeg.display(),
                    error = %e,
                    "Failed to start ffmpeg; set MUVIDGEN_FFMPEG"
                );
                return Ok(EXIT_SPAWN_FAILED);
            }
        };

        tracing::info!(
            stage = %stage,
            pid = child.id(),
            args_len = args.len(),
            "ffmpeg process started"
        );

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MuvidError::render("Failed to capture ffmpeg stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MuvidError::render("Failed to capture ffmpeg stderr"))?;

        // Drain stderr concurrently to avoid ffmpeg blocking on a full stderr pipe.
        let stderr_sink = Arc::clone(&self.output);
        let stderr_task = std::thread::spawn(move || {
            for_each_line(stderr, |line| stderr_sink(line)).ok();
        });

        let mut progress = ProgressState::default();
        let streamed = for_each_line(stdout, |line| {
            if let Some((key, value)) = line.trim().split_once('=') {
                progress.update(key, value);
            }
            (self.output)(line);
        });

        let status = child.wait()?;
        if stderr_task.join().is_err() {
            tracing::warn!(stage = %stage, "ffmpeg stderr reader panicked");
        }
        streamed?;

        let code = status.code().unwrap_or_else(|| {
            tracing::warn!(stage = %stage, "ffmpeg terminated without an exit code");
            1
        });

        tracing::info!(
            stage = %stage,
            code,
            out_time_secs = progress.out_time_secs,
            complete = progress.complete,
            "ffmpeg exited"
        );

        Ok(code)
    }

    fn probe_duration_secs(&self, path: &Path) -> Option<f64> {
        let output = Command::new(&self.tools.ffprobe)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .ok()?;

        if !output.status.success() {
            return None;
        }

        parse_probe_duration(&String::from_utf8_lossy(&output.stdout))
    }

    fn is_available(&self) -> bool {
        Command::new(&self.tools.ffmpeg)
            .args(["-hide_banner", "-version"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// Parse ffprobe's bare `format=duration` output.
fn parse_probe_duration(raw: &str) -> Option<f64> {
    let secs = raw.trim().parse::<f64>().ok()?;
    (secs >= 0.0 && secs.is_finite()).then_some(secs)
}

/// Render a command line for display, quoting arguments that contain spaces.
pub fn format_command_line(program: &Path, args: &[String]) -> String {
    std::iter::once(program.display().to_string())
        .chain(args.iter().cloned())
        .map(|arg| {
            if arg.contains(' ') {
                format!("\"{arg}\"")
            } else {
                arg
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Feed each line of `reader` to `f` as it arrives, without the line ending.
/// Invalid UTF-8 is replaced rather than treated as an error.
fn for_each_line(reader: impl Read, mut f: impl FnMut(&str)) -> std::io::Result<()> {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&buf);
        f(line.trim_end_matches(['\r', '\n']));
    }
}

/// Last position reported on ffmpeg's `-progress` channel.
#[derive(Debug, Default)]
struct ProgressState {
    out_time_secs: f64,
    complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            // ffmpeg reports microseconds under both names.
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }
}
