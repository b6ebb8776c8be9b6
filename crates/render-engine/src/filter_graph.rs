//! Overlay filter-graph construction.
//!
//! Turns the project's layer stack into a single `-filter_complex` string.
//! Every layer that renders something composites onto the stream produced
//! by the layer before it, so the graph is one chain rooted at `[0:v]`.
//! Spectrograph layers additionally tap the soundtrack (`[1:a]`), which is
//! split once into one sub-stream per spectrograph layer.

use std::fmt;

use muvidgen_project_model::layer::{Layer, SpectrographLayer, SpectrographMode, TextLayer};

/// Separator between independent filter chains.
const STAGE_SEPARATOR: &str = ";";

/// Soundtrack stream in the mux stage (second input).
const SOURCE_AUDIO: &str = "[1:a]";

/// Size of the rendered spectrograph strip.
pub const SPECTROGRAPH_SIZE: &str = "640x200";

/// Opacity suffix applied to text shadows.
const SHADOW_ALPHA: &str = "@0.6";

/// Handle naming a stream inside a filter graph, such as `[0:v]` or `[v3]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamLabel(String);

impl StreamLabel {
    /// The decoded video of the first input.
    pub fn source_video() -> Self {
        Self("[0:v]".to_string())
    }

    fn named(name: impl fmt::Display) -> Self {
        Self(format!("[{name}]"))
    }

    fn audio_tap(index: usize) -> Self {
        Self::named(format_args!("as{index}"))
    }

    fn spectrum(layer_index: usize) -> Self {
        Self::named(format_args!("spec{layer_index}"))
    }

    fn composited(layer_index: usize) -> Self {
        Self::named(format_args!("v{}", layer_index + 1))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of compiling a layer stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerGraph {
    /// Filter graph text, absent when no layer produced a stage.
    pub graph: Option<String>,

    /// Label of the final composited video stream.
    pub video_label: StreamLabel,
}

impl LayerGraph {
    fn passthrough() -> Self {
        Self {
            graph: None,
            video_label: StreamLabel::source_video(),
        }
    }
}

/// Compile `layers` into a filter graph.
///
/// Without audio, spectrograph layers have nothing to visualize and are
/// skipped. Unsupported layer types are skipped with a warning.
pub fn build_layer_graph(layers: &[Layer], has_audio: bool) -> LayerGraph {
    if layers.is_empty() {
        return LayerGraph::passthrough();
    }

    let mut stages: Vec<String> = Vec::new();
    let mut current = StreamLabel::source_video();

    let spectrograph_count = layers.iter().filter(|l| l.is_spectrograph()).count();
    if spectrograph_count > 0 && has_audio {
        stages.push(audio_split_stage(spectrograph_count));
    }

    let mut spec_index = 0usize;
    for (index, layer) in layers.iter().enumerate() {
        match layer {
            Layer::Spectrograph(spec) => {
                if !has_audio {
                    tracing::debug!(layer = index, "Skipping spectrograph layer without audio");
                    continue;
                }
                let visual = StreamLabel::spectrum(index);
                let output = StreamLabel::composited(index);
                stages.push(spectrum_stage(spec.mode(), spec_index, &visual));
                stages.push(spectrum_overlay_stage(spec, &current, &visual, &output));
                current = output;
                spec_index += 1;
            }
            Layer::Text(text) => {
                let output = StreamLabel::composited(index);
                stages.push(drawtext_stage(text, &current, &output));
                current = output;
            }
            Layer::Unsupported { kind } => {
                tracing::warn!(
                    layer = index,
                    kind = kind.as_deref().unwrap_or("<none>"),
                    "Ignoring unsupported layer type"
                );
            }
        }
    }

    if stages.is_empty() {
        return LayerGraph::passthrough();
    }

    LayerGraph {
        graph: Some(stages.join(STAGE_SEPARATOR)),
        video_label: current,
    }
}

fn audio_split_stage(count: usize) -> String {
    let outputs: String = (0..count)
        .map(|idx| StreamLabel::audio_tap(idx).0)
        .collect();
    format!("{SOURCE_AUDIO}asplit={count}{outputs}")
}

fn spectrum_stage(mode: SpectrographMode, spec_index: usize, visual: &StreamLabel) -> String {
    let input = StreamLabel::audio_tap(spec_index);
    let filter = match mode {
        SpectrographMode::Line => {
            format!("showfreqs=mode=line:ascale=log:win_size=2048:size={SPECTROGRAPH_SIZE}")
        }
        SpectrographMode::Dots => {
            format!("showfreqs=mode=dot:ascale=log:win_size=2048:size={SPECTROGRAPH_SIZE}")
        }
        SpectrographMode::Solid => format!(
            "showspectrum=s={SPECTROGRAPH_SIZE}:mode=combined:color=intensity:scale=log:win_func=hann"
        ),
        SpectrographMode::Bar => format!(
            "showspectrum=s={SPECTROGRAPH_SIZE}:mode=separate:color=intensity:scale=log:win_func=hann"
        ),
    };
    format!("{input}{filter}{visual}")
}

fn spectrum_overlay_stage(
    spec: &SpectrographLayer,
    base: &StreamLabel,
    visual: &StreamLabel,
    output: &StreamLabel,
) -> String {
    format!(
        "{base}{visual}overlay=x=W*{x}:y=H*{y}:format=auto{output}",
        x = spec.x(),
        y = spec.y(),
    )
}

fn drawtext_stage(text: &TextLayer, base: &StreamLabel, output: &StreamLabel) -> String {
    let distance = text.shadow_distance();
    format!(
        "{base}drawtext=text='{body}':fontcolor={color}:fontsize={size}:font='{font}':x=W*{x}:y=H*{y}:bordercolor={outline}:borderw={outline_w}:shadowcolor={shadow}{SHADOW_ALPHA}:shadowx={distance}:shadowy={distance}{output}",
        body = escape_text(text.text()),
        color = hex_to_ffmpeg_color(text.color()),
        size = text.font_size(),
        font = escape_text(text.font()),
        x = text.x(),
        y = text.y(),
        outline = hex_to_ffmpeg_color(text.outline_color()),
        outline_w = text.outline_width(),
        shadow = hex_to_ffmpeg_color(text.shadow_color()),
    )
}

/// Escape a free-form value for embedding in a quoted filter argument.
pub fn escape_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace(':', "\\:")
        .replace('\'', "\\'")
}

/// Convert `#RGB` / `#RRGGBB` (leading `#` optional) to ffmpeg's `0xRRGGBB`.
///
/// Anything else becomes opaque white.
pub fn hex_to_ffmpeg_color(color: &str) -> String {
    const FALLBACK: &str = "0xFFFFFF";

    let digits = color.trim();
    let digits = digits.strip_prefix('#').unwrap_or(digits);
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return FALLBACK.to_string();
    }

    let expanded: String = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect(),
        6 => digits.to_string(),
        _ => return FALLBACK.to_string(),
    };

    format!("0x{}", expanded.to_ascii_uppercase())
}
