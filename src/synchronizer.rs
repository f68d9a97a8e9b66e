//! The synchronisation pipeline: extract the reference audio, estimate every
//! video's offset against it, then render all videos side by side in sync.

use std::path::{Path, PathBuf};

use miette::{miette, Context, IntoDiagnostic, Result};
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::{
    audio::RawAudio,
    configuration::{AnalysisConfiguration, RenderingConfiguration},
    correlation::estimate_offset,
    error::SyncError,
};


/// External media tooling the pipeline depends on.
pub trait MediaToolkit {
    /// Decode the first `analysis.analysis_duration_seconds` of `input`'s audio
    /// into headerless mono `f32le` at `analysis.sample_rate_hz`, written to `output`.
    fn extract_audio(
        &self,
        input: &Path,
        output: &Path,
        analysis: &AnalysisConfiguration,
    ) -> Result<(), SyncError>;

    /// Produce `plan.output` from the synchronised videos in `plan`.
    fn render_mosaic(
        &self,
        plan: &SyncPlan,
        rendering: &RenderingConfiguration,
    ) -> Result<(), SyncError>;
}


/// What every video is aligned against.
#[derive(Clone, PartialEq, Debug)]
pub enum ReferenceSource {
    /// The first video is the reference; its audio ends up in the output.
    FirstVideo,

    /// A separate audio file (e.g. the original music track) is the reference
    /// and becomes the output's audio.
    ExternalAudio(PathBuf),
}

impl ReferenceSource {
    pub fn minimum_video_count(&self) -> usize {
        match self {
            ReferenceSource::FirstVideo => 2,
            ReferenceSource::ExternalAudio(_) => 1,
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct SyncedVideo {
    pub path: PathBuf,

    /// How much later the reference audio occurs in this video, in seconds.
    pub offset_seconds: f64,
}

#[derive(Clone, PartialEq, Debug)]
pub struct SkippedVideo {
    pub path: PathBuf,
    pub reason: String,
}

/// Everything needed to render the synchronised output.
#[derive(Clone, PartialEq, Debug)]
pub struct SyncPlan {
    pub reference: ReferenceSource,

    /// Videos in output order (left to right).
    pub videos: Vec<SyncedVideo>,

    /// Videos left out because their audio could not be analysed.
    pub skipped: Vec<SkippedVideo>,

    pub output: PathBuf,
}


pub struct Synchronizer<T>
where
    T: MediaToolkit,
{
    toolkit: T,

    analysis: AnalysisConfiguration,

    rendering: RenderingConfiguration,

    /// Holds the extracted raw audio; removed when the synchronizer is dropped.
    scratch_directory: TempDir,
}

impl<T> Synchronizer<T>
where
    T: MediaToolkit,
{
    pub fn new(
        toolkit: T,
        analysis: AnalysisConfiguration,
        rendering: RenderingConfiguration,
    ) -> Result<Self> {
        let mut scratch_builder = tempfile::Builder::new();
        scratch_builder.prefix("multivideo-sync-");

        let scratch_directory = match rendering.temporary_directory_path.as_ref() {
            Some(temporary_directory_path) => {
                std::fs::create_dir_all(temporary_directory_path)
                    .into_diagnostic()
                    .wrap_err_with(|| {
                        miette!(
                            "Failed to create temporary directory at {}.",
                            temporary_directory_path.display()
                        )
                    })?;

                scratch_builder.tempdir_in(temporary_directory_path)
            }
            None => scratch_builder.tempdir(),
        }
        .into_diagnostic()
        .wrap_err("Failed to create scratch directory for extracted audio.")?;

        debug!(
            "Extracted audio goes to {}.",
            scratch_directory.path().display()
        );

        Ok(Self {
            toolkit,
            analysis,
            rendering,
            scratch_directory,
        })
    }

    pub fn toolkit(&self) -> &T {
        &self.toolkit
    }

    fn reference_audio_path(&self) -> PathBuf {
        self.scratch_directory.path().join("reference.raw")
    }

    fn target_audio_path(&self) -> PathBuf {
        self.scratch_directory.path().join("target.raw")
    }

    fn extract_and_load(&self, input: &Path, raw_output: &Path) -> Result<RawAudio, SyncError> {
        self.toolkit
            .extract_audio(input, raw_output, &self.analysis)?;

        RawAudio::load_from_file(raw_output, self.analysis.sample_rate_hz)
    }

    /// Estimate the offset of every video against `reference`.
    ///
    /// With [`ReferenceSource::FirstVideo`] the first entry of `videos` is the reference
    /// and enters the plan with a zero offset. Videos whose audio cannot be extracted
    /// or read are skipped (and listed in [`SyncPlan::skipped`]) instead of failing the run.
    pub fn analyse(
        &self,
        reference: ReferenceSource,
        videos: &[PathBuf],
        output: PathBuf,
    ) -> Result<SyncPlan> {
        let minimum_video_count = reference.minimum_video_count();
        if videos.len() < minimum_video_count {
            return Err(SyncError::NotEnoughInputs {
                required: minimum_video_count,
                provided: videos.len(),
            }
            .into());
        }

        info!("Processing {} video(s).", videos.len());


        let (reference_path, targets) = match &reference {
            ReferenceSource::FirstVideo => (videos[0].as_path(), &videos[1..]),
            ReferenceSource::ExternalAudio(audio_path) => (audio_path.as_path(), videos),
        };

        info!("[1/3] Analysing reference {}.", reference_path.display());

        let reference_audio = self
            .extract_and_load(reference_path, &self.reference_audio_path())
            .wrap_err_with(|| {
                miette!(
                    "Failed to extract the reference audio from {}.",
                    reference_path.display()
                )
            })?;

        if reference_audio.is_empty() {
            return Err(SyncError::EmptyReferenceAudio {
                path: reference_path.to_path_buf(),
            }
            .into());
        }

        debug!(
            "Reference audio: {} samples ({:.3}s).",
            reference_audio.len(),
            reference_audio.duration_seconds()
        );


        let mut synced_videos = Vec::with_capacity(videos.len());
        let mut skipped_videos = Vec::new();

        if reference == ReferenceSource::FirstVideo {
            synced_videos.push(SyncedVideo {
                path: videos[0].clone(),
                offset_seconds: 0.0,
            });
        }

        let first_target_number = videos.len() - targets.len() + 1;

        for (target_index, target_path) in targets.iter().enumerate() {
            info!(
                "[2/3] Analysing video {} of {}: {}.",
                first_target_number + target_index,
                videos.len(),
                target_path.display()
            );

            let target_audio = match self.extract_and_load(target_path, &self.target_audio_path()) {
                Ok(target_audio) => target_audio,
                Err(error) => {
                    warn!(
                        "Skipping {}: {}",
                        target_path.display(),
                        error
                    );

                    skipped_videos.push(SkippedVideo {
                        path: target_path.clone(),
                        reason: error.to_string(),
                    });
                    continue;
                }
            };

            if target_audio.is_empty() {
                warn!(
                    "{} has no audio, keeping it without an offset.",
                    target_path.display()
                );
            }

            let estimate = estimate_offset(
                &reference_audio.samples,
                &target_audio.samples,
                &self.analysis,
            );

            info!(
                "{}: offset {:.3}s ({} samples, score {:.3}).",
                target_path.display(),
                estimate.offset_seconds,
                estimate.lag_samples,
                estimate.score
            );

            if estimate.offset_seconds < 0.0 {
                warn!(
                    "{} started {:.3}s after the reference; it will not be shifted.",
                    target_path.display(),
                    -estimate.offset_seconds
                );
            }

            synced_videos.push(SyncedVideo {
                path: target_path.clone(),
                offset_seconds: estimate.offset_seconds,
            });
        }


        if synced_videos.is_empty() {
            return Err(SyncError::NothingToRender.into());
        }

        Ok(SyncPlan {
            reference,
            videos: synced_videos,
            skipped: skipped_videos,
            output,
        })
    }

    /// Render a previously analysed plan.
    pub fn render(&self, plan: &SyncPlan) -> Result<()> {
        if plan.videos.is_empty() {
            return Err(SyncError::NothingToRender.into());
        }

        info!(
            "[3/3] Rendering {} video(s) into {}.",
            plan.videos.len(),
            plan.output.display()
        );

        self.toolkit
            .render_mosaic(plan, &self.rendering)
            .wrap_err("Failed to encode the synchronised video.")?;

        info!("Generated {}.", plan.output.display());

        Ok(())
    }

    /// Analyse and render in one go.
    pub fn synchronize(
        &self,
        reference: ReferenceSource,
        videos: &[PathBuf],
        output: PathBuf,
    ) -> Result<SyncPlan> {
        let plan = self.analyse(reference, videos, output)?;
        self.render(&plan)?;

        Ok(plan)
    }
}
