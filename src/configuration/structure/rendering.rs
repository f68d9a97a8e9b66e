use std::path::PathBuf;

use miette::{miette, Result};
use serde::Deserialize;

use super::BasePathsConfiguration;
use crate::configuration::{
    traits::ResolvableConfigurationWithContext,
    utilities::replace_placeholders_in_path,
};


#[derive(Deserialize, Clone, Debug)]
#[serde(default, deny_unknown_fields)]
pub(super) struct UnresolvedRenderingConfiguration {
    ffmpeg_binary: String,

    ffplay_binary: String,

    target_height: u32,

    video_codec: String,

    pixel_format: String,

    preset: String,

    temporary_directory_path: Option<String>,
}

impl Default for UnresolvedRenderingConfiguration {
    fn default() -> Self {
        Self {
            ffmpeg_binary: "ffmpeg".to_string(),
            ffplay_binary: "ffplay".to_string(),
            target_height: 480,
            video_codec: "libx264".to_string(),
            pixel_format: "yuv420p".to_string(),
            preset: "fast".to_string(),
            temporary_directory_path: None,
        }
    }
}

/// External tools and encoder settings used to produce the final video.
#[derive(Clone, Debug)]
pub struct RenderingConfiguration {
    pub ffmpeg_binary: String,

    pub ffplay_binary: String,

    /// Every input is scaled to this height (width follows the aspect ratio).
    pub target_height: u32,

    pub video_codec: String,

    pub pixel_format: String,

    pub preset: String,

    /// Where scratch audio files are created. `None` means the system temporary directory.
    pub temporary_directory_path: Option<PathBuf>,
}

impl ResolvableConfigurationWithContext for UnresolvedRenderingConfiguration {
    type Resolved = RenderingConfiguration;
    type Context = BasePathsConfiguration;

    fn resolve(self, context: Self::Context) -> Result<Self::Resolved> {
        if self.target_height == 0 || self.target_height % 2 != 0 {
            // yuv420p (and most encoders) require even frame dimensions.
            return Err(miette!(
                "target_height must be a positive even number, got {}.",
                self.target_height
            ));
        }

        for (field_name, value) in [
            ("ffmpeg_binary", &self.ffmpeg_binary),
            ("ffplay_binary", &self.ffplay_binary),
            ("video_codec", &self.video_codec),
            ("pixel_format", &self.pixel_format),
            ("preset", &self.preset),
        ] {
            if value.trim().is_empty() {
                return Err(miette!("{} must not be empty.", field_name));
            }
        }


        let temporary_directory_path = self
            .temporary_directory_path
            .map(|path| replace_placeholders_in_path(path, context.placeholders_map()));


        Ok(Self::Resolved {
            ffmpeg_binary: self.ffmpeg_binary,
            ffplay_binary: self.ffplay_binary,
            target_height: self.target_height,
            video_codec: self.video_codec,
            pixel_format: self.pixel_format,
            preset: self.preset,
            temporary_directory_path,
        })
    }
}

impl Default for RenderingConfiguration {
    fn default() -> Self {
        let defaults = UnresolvedRenderingConfiguration::default();

        Self {
            ffmpeg_binary: defaults.ffmpeg_binary,
            ffplay_binary: defaults.ffplay_binary,
            target_height: defaults.target_height,
            video_codec: defaults.video_codec,
            pixel_format: defaults.pixel_format,
            preset: defaults.preset,
            temporary_directory_path: None,
        }
    }
}
