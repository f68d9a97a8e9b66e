//! FFmpeg invocations: audio extraction, the final mosaic render, and ffplay previews.
//!
//! Arguments are always passed as a vector, never through a shell,
//! so input paths need no quoting.

use std::{
    ffi::{OsStr, OsString},
    path::Path,
    process::Command,
};

use tracing::{debug, warn};

use crate::{
    configuration::{AnalysisConfiguration, RenderingConfiguration},
    error::SyncError,
    synchronizer::{MediaToolkit, ReferenceSource, SyncPlan},
};


/// Arguments that decode the first `analysis_duration_seconds` of `input`'s audio
/// into headerless mono `f32le` at the analysis sample rate, overwriting `output`.
pub fn audio_extraction_arguments(
    input: &Path,
    output: &Path,
    analysis: &AnalysisConfiguration,
) -> Vec<OsString> {
    let mut arguments: Vec<OsString> = ["-y", "-hide_banner", "-loglevel", "error", "-i"]
        .into_iter()
        .map(OsString::from)
        .collect();

    arguments.push(input.as_os_str().to_owned());

    for argument in [
        "-vn".to_string(),
        "-f".to_string(),
        "f32le".to_string(),
        "-ac".to_string(),
        "1".to_string(),
        "-ar".to_string(),
        analysis.sample_rate_hz.to_string(),
        "-t".to_string(),
        analysis.analysis_duration_seconds.to_string(),
    ] {
        arguments.push(argument.into());
    }

    arguments.push(output.as_os_str().to_owned());

    arguments
}


/// The `-filter_complex` graph: scale every video to `target_height`
/// and stack them left to right into `[vout]`.
///
/// `first_video_input_index` is the FFmpeg input index of the first video
/// (`1` when input `0` is an external audio reference).
pub fn mosaic_filter_graph(
    video_count: usize,
    first_video_input_index: usize,
    target_height: u32,
) -> String {
    let mut graph = String::new();

    for video_index in 0..video_count {
        graph.push_str(&format!(
            "[{}:v]scale=-2:{}[v{}];",
            first_video_input_index + video_index,
            target_height,
            video_index
        ));
    }

    for video_index in 0..video_count {
        graph.push_str(&format!("[v{}]", video_index));
    }

    // hstack refuses a single input.
    if video_count >= 2 {
        graph.push_str(&format!("hstack=inputs={}[vout]", video_count));
    } else {
        graph.push_str("null[vout]");
    }

    graph
}


/// Full argument list for rendering `plan` into `plan.output`.
///
/// The audio of input `0` (the reference) becomes the output's audio track.
/// Videos with a positive offset are trimmed with an input-side `-ss`.
pub fn mosaic_arguments(plan: &SyncPlan, rendering: &RenderingConfiguration) -> Vec<OsString> {
    let mut arguments: Vec<OsString> = ["-y", "-hide_banner", "-loglevel", "warning"]
        .into_iter()
        .map(OsString::from)
        .collect();

    let first_video_input_index = match &plan.reference {
        ReferenceSource::ExternalAudio(audio_path) => {
            arguments.push("-i".into());
            arguments.push(audio_path.as_os_str().to_owned());
            1
        }
        ReferenceSource::FirstVideo => 0,
    };

    for video in &plan.videos {
        if video.offset_seconds > 0.0 {
            arguments.push("-ss".into());
            arguments.push(format!("{:.6}", video.offset_seconds).into());
        }

        arguments.push("-i".into());
        arguments.push(video.path.as_os_str().to_owned());
    }

    arguments.push("-filter_complex".into());
    arguments.push(
        mosaic_filter_graph(
            plan.videos.len(),
            first_video_input_index,
            rendering.target_height,
        )
        .into(),
    );

    for argument in [
        "-map",
        "[vout]",
        "-map",
        "0:a",
        "-c:v",
        rendering.video_codec.as_str(),
        "-pix_fmt",
        rendering.pixel_format.as_str(),
        "-preset",
        rendering.preset.as_str(),
    ] {
        arguments.push(argument.into());
    }

    arguments.push(plan.output.as_os_str().to_owned());

    arguments
}


fn command_line_for_display<S: AsRef<OsStr>>(program: &str, arguments: &[S]) -> String {
    let mut command_line = program.to_string();

    for argument in arguments {
        command_line.push(' ');
        command_line.push_str(&argument.as_ref().to_string_lossy());
    }

    command_line
}

/// Runs `program` to completion, capturing its output.
/// A non-zero exit status becomes [`SyncError::ToolFailed`] carrying stderr.
fn run_tool(program: &str, arguments: &[OsString]) -> Result<(), SyncError> {
    debug!("Running: {}", command_line_for_display(program, arguments));

    let output = Command::new(program)
        .args(arguments)
        .output()
        .map_err(|error| SyncError::ToolLaunch {
            program: program.to_string(),
            source: error,
        })?;

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

    if !output.status.success() {
        return Err(SyncError::ToolFailed {
            program: program.to_string(),
            status: output.status.to_string(),
            stderr,
        });
    }

    if !stderr.is_empty() {
        warn!("{} reported: {}", program, stderr);
    }

    Ok(())
}


/// [`MediaToolkit`] backed by the `ffmpeg` and `ffplay` executables.
#[derive(Clone, Debug)]
pub struct FfmpegToolkit {
    ffmpeg_binary: String,
    ffplay_binary: String,
}

impl FfmpegToolkit {
    pub fn new(rendering: &RenderingConfiguration) -> Self {
        Self {
            ffmpeg_binary: rendering.ffmpeg_binary.clone(),
            ffplay_binary: rendering.ffplay_binary.clone(),
        }
    }

    /// Opens `video_path` in ffplay and waits for playback to end.
    pub fn preview(&self, video_path: &Path) -> Result<(), SyncError> {
        let arguments: Vec<OsString> = vec!["-autoexit".into(), video_path.as_os_str().to_owned()];

        debug!(
            "Running: {}",
            command_line_for_display(&self.ffplay_binary, &arguments)
        );

        let status = Command::new(&self.ffplay_binary)
            .args(&arguments)
            .status()
            .map_err(|error| SyncError::ToolLaunch {
                program: self.ffplay_binary.clone(),
                source: error,
            })?;

        if !status.success() {
            return Err(SyncError::ToolFailed {
                program: self.ffplay_binary.clone(),
                status: status.to_string(),
                stderr: String::new(),
            });
        }

        Ok(())
    }
}

impl MediaToolkit for FfmpegToolkit {
    fn extract_audio(
        &self,
        input: &Path,
        output: &Path,
        analysis: &AnalysisConfiguration,
    ) -> Result<(), SyncError> {
        run_tool(
            &self.ffmpeg_binary,
            &audio_extraction_arguments(input, output, analysis),
        )
    }

    fn render_mosaic(
        &self,
        plan: &SyncPlan,
        rendering: &RenderingConfiguration,
    ) -> Result<(), SyncError> {
        run_tool(&self.ffmpeg_binary, &mosaic_arguments(plan, rendering))
    }
}
