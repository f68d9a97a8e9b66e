//! Errors raised by the synchronisation pipeline.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;


/// Failures of the synchronisation pipeline itself.
#[derive(Error, Diagnostic, Debug)]
pub enum SyncError {
    #[error("at least {required} video file(s) are needed, got {provided}")]
    #[diagnostic(
        code(sync::not_enough_inputs),
        help("without --reference-audio the first video is the reference, so two videos are needed")
    )]
    NotEnoughInputs { required: usize, provided: usize },

    #[error("reference audio extracted from {} is empty", path.display())]
    #[diagnostic(
        code(sync::empty_reference),
        help("make sure the reference file has an audio stream")
    )]
    EmptyReferenceAudio { path: PathBuf },

    #[error("none of the videos could be synchronised")]
    #[diagnostic(code(sync::nothing_to_render))]
    NothingToRender,

    #[error("could not read raw audio file {}", path.display())]
    #[diagnostic(code(sync::audio_read))]
    AudioRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to launch {program}")]
    #[diagnostic(
        code(sync::tool_launch),
        help("is {program} installed and on PATH? The binary can be set in the [rendering] table")
    )]
    ToolLaunch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    #[diagnostic(code(sync::tool_failed))]
    ToolFailed {
        program: String,
        status: String,
        stderr: String,
    },
}
