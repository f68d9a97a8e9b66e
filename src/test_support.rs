//! Synthetic signals shared by unit tests.

/// Deterministic pseudo-random noise in `[-1, 1)`.
pub(crate) fn noise(length: usize, seed: u64) -> Vec<f32> {
    let mut state = seed;

    (0..length)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((state >> 40) as f32 / (1u64 << 24) as f32) * 2.0 - 1.0
        })
        .collect()
}

/// Encodes samples the way FFmpeg's `f32le` muxer writes them.
pub(crate) fn encode_f32le(samples: &[f32]) -> Vec<u8> {
    samples
        .iter()
        .flat_map(|sample| sample.to_le_bytes())
        .collect()
}
