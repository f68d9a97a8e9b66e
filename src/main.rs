//! `multivideo-sync` aligns several recordings of the same event by their audio
//! and renders them side by side into one video.
//!
//! The reference is either the first video or an external audio file.
//! Every other video's offset against it is estimated with a strided
//! cross-correlation of the first seconds of audio (see [`correlation`]),
//! and FFmpeg then trims, scales and stacks the videos (see [`ffmpeg`]).

use clap::Parser;
use miette::{Context, Result};
use tracing::info;

use crate::{
    cli::CLIArgs,
    configuration::Configuration,
    ffmpeg::FfmpegToolkit,
    logging::initialize_tracing,
    synchronizer::{ReferenceSource, SyncPlan, Synchronizer},
};

mod audio;
mod cli;
mod configuration;
mod correlation;
mod error;
mod ffmpeg;
mod logging;
mod synchronizer;

#[cfg(test)]
mod test_support;


fn print_plan_summary(plan: &SyncPlan) {
    match &plan.reference {
        ReferenceSource::FirstVideo => println!("Reference: first video"),
        ReferenceSource::ExternalAudio(audio_path) => {
            println!("Reference: {}", audio_path.display())
        }
    }

    for video in &plan.videos {
        println!(
            "  {:>+9.3}s  {}",
            video.offset_seconds,
            video.path.display()
        );
    }

    for skipped_video in &plan.skipped {
        println!(
            "  {:>10}  {} ({})",
            "skipped",
            skipped_video.path.display(),
            skipped_video.reason
        );
    }
}


fn main() -> Result<()> {
    let cli_args = CLIArgs::parse();

    // Load configuration.
    let mut configuration =
        Configuration::load_or_default(cli_args.configuration_file_path.as_deref())
            .wrap_err("Failed to load configuration file.")?;

    match configuration.file_path.as_ref() {
        Some(path) => println!("Configuration loaded: {}.", path.display()),
        None => println!("No configuration file found, using built-in defaults."),
    }


    let logging_raii_guard = initialize_tracing(
        configuration.logging.console_output_level_filter(),
        configuration.logging.log_file_output_level_filter(),
        &configuration.logging.log_file_output_directory,
        "multivideo-sync",
    )
    .wrap_err("Failed to initialize tracing.")?;

    info!("Tracing initialized.");
    info!(
        "Base data directory: {}.",
        configuration.base_paths.base_data_directory_path.display()
    );


    configuration.analysis.configure(
        cli_args.analysis_duration,
        cli_args.search_range,
        cli_args.precision_step,
    );

    info!(
        "Analysing {:.1}s of audio at {} Hz, searching ±{:.1}s with precision step {}.",
        configuration.analysis.analysis_duration_seconds,
        configuration.analysis.sample_rate_hz,
        configuration.analysis.max_search_range_seconds,
        configuration.analysis.precision_step
    );


    let reference = match cli_args.reference_audio {
        Some(audio_path) => ReferenceSource::ExternalAudio(audio_path),
        None => ReferenceSource::FirstVideo,
    };

    let output_path = cli_args.output.clone().unwrap_or_default();

    let synchronizer = Synchronizer::new(
        FfmpegToolkit::new(&configuration.rendering),
        configuration.analysis,
        configuration.rendering.clone(),
    )?;

    if cli_args.analyse_only {
        let plan = synchronizer.analyse(reference, &cli_args.videos, output_path)?;
        print_plan_summary(&plan);

        drop(logging_raii_guard);
        return Ok(());
    }

    let plan = synchronizer.synchronize(reference, &cli_args.videos, output_path)?;
    print_plan_summary(&plan);
    println!("Generated: {}", plan.output.display());

    if cli_args.preview {
        synchronizer
            .toolkit()
            .preview(&plan.output)
            .wrap_err("Failed to preview the generated video.")?;
    }


    drop(logging_raii_guard);
    Ok(())
}
