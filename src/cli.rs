//! Command-line interface definitions.

use std::path::PathBuf;

use clap::Parser;



/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "multivideo-sync",
    author,
    about = "Synchronises several recordings of the same event by their audio \
             and renders them side by side.",
    version
)]
pub struct CLIArgs {
    /// This is the path to the configuration file to use.
    /// If unspecified, `./data/configuration.toml` is used when it exists,
    /// and built-in defaults otherwise.
    #[arg(
        short = 'c',
        long = "configuration-file-path",
        help = "Path to the configuration file to use. Defaults to ./data/configuration.toml \
                (built-in defaults if that file does not exist)."
    )]
    pub configuration_file_path: Option<PathBuf>,

    #[arg(
        short = 'a',
        long = "reference-audio",
        help = "Audio file (e.g. the original music track) to align every video against. \
                Its audio becomes the soundtrack of the output. If unspecified, \
                the first video is the reference."
    )]
    pub reference_audio: Option<PathBuf>,

    #[arg(
        short = 'o',
        long = "output",
        required_unless_present = "analyse_only",
        help = "Path of the synchronised video to generate."
    )]
    pub output: Option<PathBuf>,

    #[arg(
        long = "analysis-duration",
        allow_negative_numbers = true,
        help = "Seconds of audio (from the start of each input) to analyse. \
                Non-positive values are ignored. Overrides the configuration file."
    )]
    pub analysis_duration: Option<f64>,

    #[arg(
        long = "search-range",
        allow_negative_numbers = true,
        help = "Largest offset, in seconds, to search for in either direction. \
                Non-positive values are ignored. Overrides the configuration file."
    )]
    pub search_range: Option<f64>,

    #[arg(
        long = "precision-step",
        allow_negative_numbers = true,
        help = "Compare every N-th sample when scoring an offset (1 is the most precise). \
                Non-positive values are ignored. Overrides the configuration file."
    )]
    pub precision_step: Option<i64>,

    #[arg(
        long = "analyse-only",
        help = "Only estimate and print the offsets, without rendering anything."
    )]
    pub analyse_only: bool,

    #[arg(
        long = "preview",
        conflicts_with = "analyse_only",
        help = "Play the generated video with ffplay once rendering finishes."
    )]
    pub preview: bool,

    #[arg(
        required = true,
        num_args = 1..,
        value_name = "VIDEOS",
        help = "Video files to synchronise, in left-to-right output order."
    )]
    pub videos: Vec<PathBuf>,
}


#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        CLIArgs::command().debug_assert();
    }

    #[test]
    fn parses_an_external_audio_run() {
        let arguments = CLIArgs::try_parse_from([
            "multivideo-sync",
            "-a",
            "music.mp3",
            "-o",
            "out.mp4",
            "--precision-step",
            "10",
            "a.mp4",
            "b.mp4",
        ])
        .unwrap();

        assert_eq!(arguments.reference_audio, Some(PathBuf::from("music.mp3")));
        assert_eq!(arguments.output, Some(PathBuf::from("out.mp4")));
        assert_eq!(arguments.precision_step, Some(10));
        assert_eq!(
            arguments.videos,
            vec![PathBuf::from("a.mp4"), PathBuf::from("b.mp4")]
        );
        assert!(!arguments.analyse_only);
    }

    #[test]
    fn output_is_required_unless_only_analysing() {
        assert!(CLIArgs::try_parse_from(["multivideo-sync", "a.mp4", "b.mp4"]).is_err());

        let arguments =
            CLIArgs::try_parse_from(["multivideo-sync", "--analyse-only", "a.mp4", "b.mp4"])
                .unwrap();
        assert!(arguments.analyse_only);
        assert!(arguments.output.is_none());
    }

    #[test]
    fn at_least_one_video_is_required() {
        assert!(CLIArgs::try_parse_from(["multivideo-sync", "-o", "out.mp4"]).is_err());
    }

    #[test]
    fn negative_overrides_parse_and_are_left_to_configure() {
        let arguments = CLIArgs::try_parse_from([
            "multivideo-sync",
            "-o",
            "out.mp4",
            "--search-range",
            "-5",
            "a.mp4",
        ])
        .unwrap();

        assert_eq!(arguments.search_range, Some(-5.0));
    }
}
