//! Time offset estimation between two recordings of the same audio,
//! using a strided cross-correlation over the middle third of the overlap.

use rayon::prelude::*;
use tracing::{debug, trace};

use crate::configuration::AnalysisConfiguration;


/// Best match found by [`estimate_offset`].
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct OffsetEstimate {
    /// Lag (in samples) at which the target best matches the reference.
    pub lag_samples: i64,

    /// The same lag in seconds. Positive means the shared audio occurs
    /// later in the target than in the reference.
    pub offset_seconds: f64,

    /// Correlation score at the chosen lag.
    pub score: f64,
}

impl OffsetEstimate {
    fn zero() -> Self {
        Self {
            lag_samples: 0,
            offset_seconds: 0.0,
            score: 0.0,
        }
    }
}


/// Correlation score of `target` shifted by `lag` against `reference`.
///
/// Only reference indices in `[n/3, 2n/3)` with stride `precision_step` contribute,
/// where `n` is the length of the shorter signal.
/// Terms whose shifted index falls outside `target` are skipped.
fn score_lag(reference: &[f32], target: &[f32], lag: i64, precision_step: usize) -> f64 {
    let overlap_length = reference.len().min(target.len());
    let scan_start = overlap_length / 3;
    let scan_end = 2 * overlap_length / 3;

    let mut score = 0f64;

    for reference_index in (scan_start..scan_end).step_by(precision_step) {
        let target_index = reference_index as i64 + lag;

        if target_index >= 0 && (target_index as usize) < target.len() {
            score += (reference[reference_index] * target[target_index as usize]) as f64;
        }
    }

    score
}


/// Estimate how far `target` is shifted relative to `reference`.
///
/// Candidate lags run from `-range` (inclusive) to `range` (exclusive) in steps of
/// `lag_step_samples`, where `range` is the configured search range in samples.
/// The first lag (in ascending order) with the strictly highest score wins;
/// a score must beat `-1.0` to be chosen at all, otherwise the lag stays `0`.
///
/// Returns a zero offset if either signal is empty.
pub fn estimate_offset(
    reference: &[f32],
    target: &[f32],
    analysis: &AnalysisConfiguration,
) -> OffsetEstimate {
    if reference.is_empty() || target.is_empty() {
        debug!("Empty signal given to the correlator, assuming no offset.");
        return OffsetEstimate::zero();
    }

    let search_range = analysis.search_range_samples();
    let candidates = CandidateLags::new(
        search_range,
        analysis.lag_step_samples as i64,
        reference.len().min(target.len()) as i64,
        target.len() as i64,
    );

    trace!(
        "Scoring {} of the candidate lags over ±{} samples.",
        candidates.scored_count,
        search_range
    );


    let best_in_window = (0..candidates.scored_count)
        .into_par_iter()
        .map(|offset| {
            let lag = candidates.first_scored_lag + offset * candidates.lag_step;
            (lag, score_lag(reference, target, lag, analysis.precision_step))
        })
        .chain(candidates.unscored_representative.map(|lag| (lag, 0f64)))
        .reduce_with(better_candidate);

    let (best_lag, best_score) = match best_in_window {
        Some((lag, score)) if score > -1.0 => (lag, score),
        _ => (0, -1.0),
    };


    OffsetEstimate {
        lag_samples: best_lag,
        offset_seconds: best_lag as f64 / analysis.sample_rate_hz as f64,
        score: best_score,
    }
}


/// Higher score wins; equal scores keep the smaller lag.
/// Associative, so a parallel reduction picks the same lag as a left-to-right scan.
fn better_candidate(left: (i64, f64), right: (i64, f64)) -> (i64, f64) {
    if right.1 > left.1 || (right.1 == left.1 && right.0 < left.0) {
        right
    } else {
        left
    }
}


/// The candidate lag grid `-range, -range + step, …` (while `< range`), split into
/// the lags that can overlap the signals and therefore need scoring,
/// plus the earliest lag that cannot (it scores exactly `0.0`, and ties keep the
/// earliest lag, so no other non-overlapping lag can ever be chosen).
#[derive(Debug, PartialEq)]
struct CandidateLags {
    lag_step: i64,
    first_scored_lag: i64,
    scored_count: i64,
    unscored_representative: Option<i64>,
}

impl CandidateLags {
    fn new(search_range: i64, lag_step: i64, overlap_length: i64, target_length: i64) -> Self {
        let range = search_range.max(0) as i128;
        let step = lag_step.max(1) as i128;

        // Lags outside [-overlap_length, target_length) never pair a scanned
        // reference sample with a target sample.
        let window_start = -(overlap_length as i128);
        let window_end = target_length as i128;

        let grid_length = (2 * range + step - 1) / step;
        let first_index_at_or_after = |lag: i128| -> i128 {
            let distance = lag + range;
            if distance <= 0 {
                0
            } else {
                ((distance + step - 1) / step).min(grid_length)
            }
        };

        let scored_start = first_index_at_or_after(window_start);
        let scored_end = first_index_at_or_after(window_end).max(scored_start);

        let unscored_representative = if scored_start > 0 {
            Some(-range)
        } else if scored_end < grid_length {
            Some(-range + scored_end * step)
        } else {
            None
        };

        let first_scored_lag = if scored_end > scored_start {
            -range + scored_start * step
        } else {
            0
        };

        // Every grid lag lies within [-range, range), which fits in an i64.
        Self {
            lag_step: step as i64,
            first_scored_lag: first_scored_lag as i64,
            scored_count: (scored_end - scored_start) as i64,
            unscored_representative: unscored_representative.map(|lag| lag as i64),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::noise;

    fn analysis(
        sample_rate_hz: u32,
        range_seconds: f64,
        precision_step: usize,
        lag_step: usize,
    ) -> AnalysisConfiguration {
        AnalysisConfiguration {
            sample_rate_hz,
            analysis_duration_seconds: 60.0,
            max_search_range_seconds: range_seconds,
            precision_step,
            lag_step_samples: lag_step,
        }
    }

    #[test]
    fn empty_signals_have_no_offset() {
        let parameters = analysis(1_000, 1.0, 1, 1);

        assert_eq!(estimate_offset(&[], &[1.0, 2.0], &parameters).offset_seconds, 0.0);
        assert_eq!(estimate_offset(&[1.0, 2.0], &[], &parameters).offset_seconds, 0.0);
    }

    #[test]
    fn identical_signals_have_no_offset() {
        let signal = noise(6_000, 7);
        let estimate = estimate_offset(&signal, &signal, &analysis(1_000, 0.5, 1, 1));

        assert_eq!(estimate.lag_samples, 0);
        assert_eq!(estimate.offset_seconds, 0.0);
    }

    #[test]
    fn finds_a_target_that_started_recording_earlier() {
        // The target contains 250 extra samples before the shared audio,
        // so the shared audio occurs 250 samples later in the target.
        let shared = noise(8_000, 42);
        let reference = shared.clone();
        let mut target = noise(250, 99);
        target.extend_from_slice(&shared);

        let estimate = estimate_offset(&reference, &target, &analysis(1_000, 1.0, 1, 1));

        assert_eq!(estimate.lag_samples, 250);
        assert!((estimate.offset_seconds - 0.25).abs() < 1e-9);
    }

    #[test]
    fn finds_a_target_that_started_recording_later() {
        let shared = noise(8_000, 3);
        let reference = shared.clone();
        let target = shared[400..].to_vec();

        let estimate = estimate_offset(&reference, &target, &analysis(1_000, 1.0, 1, 1));

        assert_eq!(estimate.lag_samples, -400);
        assert!((estimate.offset_seconds + 0.4).abs() < 1e-9);
    }

    #[test]
    fn lag_grid_is_respected() {
        let shared = noise(8_000, 11);
        let mut target = noise(300, 5);
        target.extend_from_slice(&shared);

        let estimate = estimate_offset(&shared, &target, &analysis(1_000, 1.0, 1, 20));

        assert_eq!(estimate.lag_samples % 20, 0);
        assert_eq!(estimate.lag_samples, 300);
    }

    #[test]
    fn ties_keep_the_earliest_lag() {
        // All-zero target: every lag scores 0.0, the first candidate wins.
        let reference = noise(3_000, 1);
        let target = vec![0.0; 3_000];

        let estimate = estimate_offset(&reference, &target, &analysis(100, 1.0, 1, 10));

        assert_eq!(estimate.lag_samples, -100);
        assert_eq!(estimate.score, 0.0);
    }

    #[test]
    fn scores_below_the_floor_keep_zero_lag() {
        // Perfect anti-correlation everywhere: every score is far below -1.0.
        let reference = vec![1.0; 3_000];
        let target = vec![-1.0; 3_000];

        let estimate = estimate_offset(&reference, &target, &analysis(100, 1.0, 1, 10));

        assert_eq!(estimate.lag_samples, 0);
        assert_eq!(estimate.score, -1.0);
    }

    #[test]
    fn score_skips_out_of_range_target_indices() {
        let reference = vec![1.0; 9];
        let target = vec![1.0; 9];

        // Scan covers indices 3, 4, 5. With lag 4 only 3 and 4 land inside the target.
        assert_eq!(score_lag(&reference, &target, 4, 1), 2.0);
        assert_eq!(score_lag(&reference, &target, -4, 1), 2.0);
        assert_eq!(score_lag(&reference, &target, 0, 2), 2.0);
    }

    /// Left-to-right scan over every candidate lag, scoring each one.
    fn scan_every_lag(reference: &[f32], target: &[f32], analysis: &AnalysisConfiguration) -> (i64, f64) {
        let range = analysis.search_range_samples();
        let mut best = (0i64, -1f64);

        for lag in (-range..range).step_by(analysis.lag_step_samples) {
            let score = score_lag(reference, target, lag, analysis.precision_step);
            if score > best.1 {
                best = (lag, score);
            }
        }

        best
    }

    #[test]
    fn matches_a_full_scan_when_the_range_exceeds_the_signals() {
        let shared = noise(1_000, 21);
        let mut shifted = noise(90, 22);
        shifted.extend_from_slice(&shared[..700]);

        let cases: Vec<(Vec<f32>, Vec<f32>)> = vec![
            (shared.clone(), shifted.clone()),
            (shifted.clone(), shared.clone()),
            (shared.clone(), vec![0.0; 800]),
            (vec![1.0; 900], vec![-1.0; 600]),
            (shared[..400].to_vec(), shared.clone()),
        ];

        for (reference, target) in &cases {
            for lag_step in [1, 7, 20] {
                let parameters = analysis(1_000, 3.0, 3, lag_step);
                let estimate = estimate_offset(reference, target, &parameters);

                assert_eq!(
                    (estimate.lag_samples, estimate.score),
                    scan_every_lag(reference, target, &parameters),
                    "lag step {}",
                    lag_step
                );
            }
        }
    }

    #[test]
    fn huge_search_range_still_finds_the_offset() {
        let shared = noise(8_000, 42);
        let mut target = noise(250, 99);
        target.extend_from_slice(&shared);

        let mut parameters = analysis(1_000, 1.0, 1, 1);
        parameters.configure(None, Some(1e15), None);

        let estimate = estimate_offset(&shared, &target, &parameters);
        assert_eq!(estimate.lag_samples, 250);
    }

    #[test]
    fn saturated_search_range_keeps_the_earliest_tied_lag() {
        let reference = noise(3_000, 1);
        let target = vec![0.0; 3_000];

        let mut parameters = analysis(40_000, 1.0, 1, 20);
        parameters.configure(None, Some(1e300), None);
        assert_eq!(parameters.search_range_samples(), i64::MAX);

        let estimate = estimate_offset(&reference, &target, &parameters);
        assert_eq!(estimate.lag_samples, -i64::MAX);
        assert_eq!(estimate.score, 0.0);
    }

    #[test]
    fn only_overlapping_lags_are_scored() {
        assert_eq!(
            CandidateLags::new(100, 10, 30, 40),
            CandidateLags {
                lag_step: 10,
                first_scored_lag: -30,
                scored_count: 7,
                unscored_representative: Some(-100),
            }
        );

        // Range smaller than the signals: every lag is scored.
        assert_eq!(
            CandidateLags::new(20, 10, 300, 400),
            CandidateLags {
                lag_step: 10,
                first_scored_lag: -20,
                scored_count: 4,
                unscored_representative: None,
            }
        );

        // Window starts at the first lag, the representative comes after it.
        assert_eq!(
            CandidateLags::new(50, 10, 300, 20),
            CandidateLags {
                lag_step: 10,
                first_scored_lag: -50,
                scored_count: 7,
                unscored_representative: Some(20),
            }
        );
    }
}
