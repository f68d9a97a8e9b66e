use miette::{miette, Result};
use serde::Deserialize;
use tracing::warn;

use crate::configuration::traits::ResolvableConfiguration;


fn is_positive_and_finite(value: f64) -> bool {
    value.is_finite() && value > 0.0
}


#[derive(Deserialize, Clone, Debug)]
#[serde(default, deny_unknown_fields)]
pub(super) struct UnresolvedAnalysisConfiguration {
    sample_rate_hz: u32,

    analysis_duration_seconds: f64,

    max_search_range_seconds: f64,

    precision_step: usize,

    lag_step_samples: usize,
}

impl Default for UnresolvedAnalysisConfiguration {
    fn default() -> Self {
        Self {
            sample_rate_hz: 40_000,
            analysis_duration_seconds: 60.0,
            max_search_range_seconds: 30.0,
            precision_step: 100,
            lag_step_samples: 20,
        }
    }
}


/// Parameters of the audio offset analysis.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct AnalysisConfiguration {
    /// Sample rate the audio is resampled to before correlating (in Hz).
    pub sample_rate_hz: u32,

    /// How much audio (from the start of each input) is extracted and analysed.
    pub analysis_duration_seconds: f64,

    /// The largest offset (in either direction) that is searched for.
    pub max_search_range_seconds: f64,

    /// Stride over reference samples when scoring a lag.
    /// Smaller is more precise and slower; `1` compares every sample.
    pub precision_step: usize,

    /// Stride over candidate lags, in samples.
    pub lag_step_samples: usize,
}

impl ResolvableConfiguration for UnresolvedAnalysisConfiguration {
    type Resolved = AnalysisConfiguration;

    fn resolve(self) -> Result<Self::Resolved> {
        if self.sample_rate_hz == 0 {
            return Err(miette!("sample_rate_hz must be larger than zero."));
        }

        if !is_positive_and_finite(self.analysis_duration_seconds) {
            return Err(miette!(
                "analysis_duration_seconds must be a finite number larger than zero, got {}.",
                self.analysis_duration_seconds
            ));
        }

        if !is_positive_and_finite(self.max_search_range_seconds) {
            return Err(miette!(
                "max_search_range_seconds must be a finite number larger than zero, got {}.",
                self.max_search_range_seconds
            ));
        }

        if self.precision_step == 0 {
            return Err(miette!("precision_step must be larger than zero."));
        }

        if self.lag_step_samples == 0 {
            return Err(miette!("lag_step_samples must be larger than zero."));
        }


        Ok(AnalysisConfiguration {
            sample_rate_hz: self.sample_rate_hz,
            analysis_duration_seconds: self.analysis_duration_seconds,
            max_search_range_seconds: self.max_search_range_seconds,
            precision_step: self.precision_step,
            lag_step_samples: self.lag_step_samples,
        })
    }
}

impl Default for AnalysisConfiguration {
    fn default() -> Self {
        // PANIC SAFETY: The built-in defaults are all strictly positive.
        UnresolvedAnalysisConfiguration::default().resolve().unwrap()
    }
}

impl AnalysisConfiguration {
    /// Overrides the analysis parameters.
    ///
    /// Each value is applied only if it is present, finite and strictly positive;
    /// otherwise the current value is kept.
    pub fn configure(
        &mut self,
        analysis_duration_seconds: Option<f64>,
        max_search_range_seconds: Option<f64>,
        precision_step: Option<i64>,
    ) {
        if let Some(duration) = analysis_duration_seconds {
            if is_positive_and_finite(duration) {
                self.analysis_duration_seconds = duration;
            } else {
                warn!("Ignoring invalid analysis duration: {}.", duration);
            }
        }

        if let Some(range) = max_search_range_seconds {
            if is_positive_and_finite(range) {
                self.max_search_range_seconds = range;
            } else {
                warn!("Ignoring invalid search range: {}.", range);
            }
        }

        if let Some(step) = precision_step {
            if step > 0 {
                self.precision_step = step as usize;
            } else {
                warn!("Ignoring non-positive precision step: {}.", step);
            }
        }
    }

    /// Search range in samples, in each direction.
    pub fn search_range_samples(&self) -> i64 {
        (self.sample_rate_hz as f64 * self.max_search_range_seconds) as i64
    }
}
