use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const BIN: &str = env!("CARGO_BIN_EXE_muvidgen");

fn muvidgen(args: &[&Path], ffmpeg: &Path, ffprobe: &Path) -> Output {
    Command::new(BIN)
        .args(args)
        .env("MUVIDGEN_FFMPEG", ffmpeg)
        .env("MUVIDGEN_FFPROBE", ffprobe)
        .env_remove("RUST_LOG")
        .output()
        .expect("muvidgen binary should run")
}

fn write_project(dir: &Path, body: serde_json::Value) -> PathBuf {
    let path = dir.join("project.json");
    std::fs::write(&path, serde_json::to_string_pretty(&body).unwrap()).unwrap();
    path
}

fn missing_tool(dir: &Path) -> PathBuf {
    dir.join("no-such-tool")
}

#[test]
fn no_arguments_is_a_usage_error() {
    let output = Command::new(BIN).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn extra_arguments_are_a_usage_error() {
    let output = Command::new(BIN).args(["a.json", "b.json"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn missing_project_file_exits_with_2() {
    let dir = tempfile::tempdir().unwrap();
    let tool = missing_tool(dir.path());
    let output = muvidgen(&[&dir.path().join("absent.json")], &tool, &tool);

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Project JSON not found"));
}

#[test]
fn malformed_json_exits_with_2() {
    let dir = tempfile::tempdir().unwrap();
    let project = dir.path().join("project.json");
    std::fs::write(&project, "{\"version\": ").unwrap();
    let tool = missing_tool(dir.path());

    let output = muvidgen(&[&project], &tool, &tool);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn missing_clips_list_exits_with_2() {
    let dir = tempfile::tempdir().unwrap();
    let project = write_project(dir.path(), serde_json::json!({"version": "1.0"}));
    let tool = missing_tool(dir.path());

    let output = muvidgen(&[&project], &tool, &tool);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("clips"));
}

#[test]
fn unavailable_engine_exits_with_2() {
    let dir = tempfile::tempdir().unwrap();
    let clip = dir.path().join("a.mp4");
    std::fs::write(&clip, b"media").unwrap();
    let project = write_project(
        dir.path(),
        serde_json::json!({"version": "1.0", "clips": [{"path": clip}]}),
    );
    let tool = missing_tool(dir.path());

    let output = muvidgen(&[&project], &tool, &tool);
    assert_eq!(output.status.code(), Some(2));
    assert!(!dir.path().join(".muvidgen").exists());
}

#[cfg(unix)]
mod with_fake_tools {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::sync::Mutex;

    // Writing and then executing scripts from parallel threads can hit ETXTBSY.
    static SERIAL: Mutex<()> = Mutex::new(());

    const FAKE_FFMPEG: &str = r#"#!/bin/sh
if [ "$1" = "-hide_banner" ] && [ "$2" = "-version" ]; then
    exit 0
fi
echo "$*" >> "$(dirname "$0")/calls.log"
for last; do :; done
printf 'rendered' > "$last"
echo "progress=end"
exit "${FAKE_FFMPEG_EXIT:-0}"
"#;

    const FAKE_FFPROBE: &str = "#!/bin/sh\necho 2.5\n";

    struct Tools {
        dir: tempfile::TempDir,
        ffmpeg: PathBuf,
        ffprobe: PathBuf,
    }

    impl Tools {
        fn install() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let ffmpeg = install_script(dir.path(), "ffmpeg", FAKE_FFMPEG);
            let ffprobe = install_script(dir.path(), "ffprobe", FAKE_FFPROBE);
            Self {
                dir,
                ffmpeg,
                ffprobe,
            }
        }

        fn calls(&self) -> Vec<String> {
            std::fs::read_to_string(self.dir.path().join("calls.log"))
                .map(|log| log.lines().map(str::to_string).collect())
                .unwrap_or_default()
        }
    }

    fn install_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn media_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.mp4", "b.mp4", "bg.mp3"] {
            std::fs::write(dir.path().join(name), b"media").unwrap();
        }
        dir
    }

    #[test]
    fn renders_clips_audio_and_text_layer() {
        let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
        let tools = Tools::install();
        let media = media_dir();
        let project = write_project(
            media.path(),
            serde_json::json!({
                "version": "1.0",
                "clips": [
                    {"path": media.path().join("a.mp4")},
                    {"path": media.path().join("b.mp4")},
                ],
                "audio": {"path": media.path().join("bg.mp3")},
                "layers": [{"type": "text", "text": "Hi"}],
            }),
        );

        let output = muvidgen(&[&project], &tools.ffmpeg, &tools.ffprobe);
        let stdout = String::from_utf8_lossy(&output.stdout);

        assert_eq!(output.status.code(), Some(0), "stdout: {stdout}");
        assert!(stdout.contains("clips: 2"));
        assert!(stdout.contains("layers: 1"));
        assert!(stdout.contains("total_duration_ms=5000"));
        assert!(stdout.contains("[ffmpeg] "));
        assert!(stdout.contains("progress=end"));

        let rendered = media.path().join("project_render.mp4");
        assert!(std::fs::metadata(&rendered).unwrap().len() > 0);

        let calls = tools.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].contains("-f concat"));
        assert!(calls[1].contains("-filter_complex"));
        assert!(calls[1].contains("-map 1:a"));
    }

    #[test]
    fn clips_only_project_skips_mux_stage() {
        let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
        let tools = Tools::install();
        let media = media_dir();
        let project = write_project(
            media.path(),
            serde_json::json!({
                "version": "1.0",
                "clips": [{"path": media.path().join("a.mp4")}],
            }),
        );

        let output = muvidgen(&[&project], &tools.ffmpeg, &tools.ffprobe);

        assert_eq!(output.status.code(), Some(0));
        assert_eq!(tools.calls().len(), 1);
        let rendered = media.path().join("project_render.mp4");
        assert_eq!(std::fs::read(rendered).unwrap(), b"rendered");
    }

    #[test]
    fn unsupported_version_launches_nothing() {
        let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
        let tools = Tools::install();
        let media = media_dir();
        let project = write_project(
            media.path(),
            serde_json::json!({
                "version": "0.9",
                "clips": [{"path": media.path().join("a.mp4")}],
            }),
        );

        let output = muvidgen(&[&project], &tools.ffmpeg, &tools.ffprobe);

        assert_eq!(output.status.code(), Some(2));
        assert!(tools.calls().is_empty());
        assert!(!media.path().join("project_render.mp4").exists());
        assert!(!media.path().join(".muvidgen").exists());
    }

    #[test]
    fn missing_clip_launches_no_stage() {
        let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
        let tools = Tools::install();
        let media = media_dir();
        let project = write_project(
            media.path(),
            serde_json::json!({
                "version": "1.0",
                "clips": [{"path": media.path().join("gone.mp4")}],
            }),
        );

        let output = muvidgen(&[&project], &tools.ffmpeg, &tools.ffprobe);

        assert_eq!(output.status.code(), Some(2));
        assert!(String::from_utf8_lossy(&output.stderr).contains("Missing clip"));
        assert!(tools.calls().is_empty());
    }

    #[test]
    fn output_path_that_is_a_directory_exits_with_1() {
        let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
        let tools = Tools::install();
        let media = media_dir();
        let output = media.path().join("outdir");
        std::fs::create_dir(&output).unwrap();
        let project = write_project(
            media.path(),
            serde_json::json!({
                "version": "1.0",
                "clips": [{"path": media.path().join("a.mp4")}],
                "output": {"path": output},
            }),
        );

        let output_run = muvidgen(&[&project], &tools.ffmpeg, &tools.ffprobe);

        assert_eq!(output_run.status.code(), Some(1));
        assert!(String::from_utf8_lossy(&output_run.stderr).contains("Failed to move"));
        assert_eq!(tools.calls().len(), 1);
        assert!(output.is_dir());
    }

    #[test]
    fn stage_failure_exit_code_is_propagated() {
        let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
        let tools = Tools::install();
        let media = media_dir();
        let project = write_project(
            media.path(),
            serde_json::json!({
                "version": "1.0",
                "clips": [{"path": media.path().join("a.mp4")}],
                "audio": {"path": media.path().join("bg.mp3")},
            }),
        );

        let output = Command::new(BIN)
            .arg(&project)
            .env("MUVIDGEN_FFMPEG", &tools.ffmpeg)
            .env("MUVIDGEN_FFPROBE", &tools.ffprobe)
            .env("FAKE_FFMPEG_EXIT", "7")
            .output()
            .unwrap();

        assert_eq!(output.status.code(), Some(7));
        assert!(String::from_utf8_lossy(&output.stderr)
            .contains("Concat stage failed with code 7"));
        assert_eq!(tools.calls().len(), 1);
    }
}
