use std::fs;
use std::path::{Path, PathBuf};

use miette::{miette, Context, IntoDiagnostic, Result};
use serde::Deserialize;
use tracing::debug;

pub use self::analysis::AnalysisConfiguration;
use self::analysis::UnresolvedAnalysisConfiguration;
pub use self::base_paths::BasePathsConfiguration;
use self::base_paths::UnresolvedBasePathsConfiguration;
pub use self::logging::LoggingConfiguration;
use self::logging::UnresolvedLoggingConfiguration;
pub use self::rendering::RenderingConfiguration;
use self::rendering::UnresolvedRenderingConfiguration;
use super::traits::{ResolvableConfiguration, ResolvableConfigurationWithContext};
use super::utilities::get_default_configuration_file_path;

mod analysis;
mod base_paths;
mod logging;
mod rendering;



#[derive(Deserialize, Debug, Default)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct UnresolvedConfiguration {
    /// Base paths.
    base_paths: UnresolvedBasePathsConfiguration,

    /// Logging-related configuration.
    logging: UnresolvedLoggingConfiguration,

    /// Audio offset analysis parameters.
    analysis: UnresolvedAnalysisConfiguration,

    /// FFmpeg and encoder settings.
    rendering: UnresolvedRenderingConfiguration,
}


/// The entire configuration.
#[derive(Debug, Clone)]
pub struct Configuration {
    /// This is the file path this `Configuration` instance was loaded from.
    /// `None` if the built-in defaults were used.
    pub file_path: Option<PathBuf>,

    /// Base paths
    pub base_paths: BasePathsConfiguration,

    /// Logging-related configuration.
    pub logging: LoggingConfiguration,

    /// Audio offset analysis parameters.
    pub analysis: AnalysisConfiguration,

    /// FFmpeg and encoder settings.
    pub rendering: RenderingConfiguration,
}


impl ResolvableConfigurationWithContext for UnresolvedConfiguration {
    type Resolved = Configuration;
    type Context = Option<PathBuf>;

    fn resolve(self, context: Self::Context) -> Result<Self::Resolved> {
        let base_paths = self
            .base_paths
            .resolve()
            .wrap_err("Failed to resolve base_paths table.")?;

        let logging = self
            .logging
            .resolve(base_paths.clone())
            .wrap_err("Failed to resolve logging table.")?;

        let analysis = self
            .analysis
            .resolve()
            .wrap_err("Failed to resolve analysis table.")?;

        let rendering = self
            .rendering
            .resolve(base_paths.clone())
            .wrap_err("Failed to resolve rendering table.")?;


        Ok(Configuration {
            file_path: context,
            base_paths,
            logging,
            analysis,
            rendering,
        })
    }
}


impl Configuration {
    /// Load the configuration from a specific file path.
    pub fn load_from_path<S: AsRef<Path>>(configuration_file_path: S) -> Result<Self> {
        let configuration_file_path = configuration_file_path.as_ref();

        // Read the configuration file into memory.
        let configuration_string = fs::read_to_string(configuration_file_path)
            .into_diagnostic()
            .wrap_err_with(|| {
                miette!(
                    "Could not read configuration file at {}.",
                    configuration_file_path.display()
                )
            })?;


        let configuration_file_path = dunce::canonicalize(configuration_file_path)
            .into_diagnostic()
            .wrap_err("Could not canonicalize configuration file path!")?;

        Self::load_from_str(&configuration_string, Some(configuration_file_path))
    }

    /// Parse the configuration from its TOML contents and resolve it.
    /// `file_path` is only recorded, not read.
    pub fn load_from_str(configuration_string: &str, file_path: Option<PathBuf>) -> Result<Self> {
        // Parse the string into the `UnresolvedConfiguration` structure and then resolve it.
        let unresolved_configuration =
            toml::from_str::<UnresolvedConfiguration>(configuration_string)
                .into_diagnostic()
                .wrap_err("Could not parse configuration file!")?;

        unresolved_configuration
            .resolve(file_path)
            .wrap_err("Failed to resolve configuration.")
    }

    /// Load the configuration from the default path (`./data/configuration.toml`).
    #[allow(dead_code)]
    pub fn load_from_default_path() -> Result<Configuration> {
        Configuration::load_from_path(
            get_default_configuration_file_path()
                .wrap_err_with(|| "Could not load configuration file at default path.")?,
        )
    }

    /// Load the configuration from `explicit_path` if one is given (it must exist),
    /// otherwise from the default path if a file exists there,
    /// otherwise fall back to the built-in defaults.
    pub fn load_or_default(explicit_path: Option<&Path>) -> Result<Configuration> {
        Configuration::load_or_default_with_fallback(
            explicit_path,
            &get_default_configuration_file_path()?,
        )
    }

    fn load_or_default_with_fallback(
        explicit_path: Option<&Path>,
        default_path: &Path,
    ) -> Result<Configuration> {
        if let Some(path) = explicit_path {
            return Configuration::load_from_path(path);
        }

        if default_path.is_file() {
            return Configuration::load_from_path(default_path);
        }

        debug!(
            "No configuration file at {}, using built-in defaults.",
            default_path.display()
        );

        UnresolvedConfiguration::default()
            .resolve(None)
            .wrap_err("Failed to resolve built-in default configuration.")
    }
}
