//! Pluggable chooser strategies.
//!
//! After the selector has produced a non-empty list of acceptable
//! candidates, a chooser picks exactly one index. The driver's own
//! ordering is authoritative, so [`FirstMatch`] is usually right;
//! [`ClosestMatch`] re-ranks by weighted distance for callers that care
//! more about exact depths than driver preference.

use crate::caps::{Acceleration, SurfaceCaps};

/// Picks one index among ranked candidate descriptors.
pub trait CapsChooser {
    /// Returns the index of the chosen candidate, or `None` when no
    /// candidate is acceptable. `candidates` is never empty.
    fn choose(&self, requested: &SurfaceCaps, candidates: &[SurfaceCaps]) -> Option<usize>;
}

/// Takes the first candidate: trusts the driver's preference order.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstMatch;

impl CapsChooser for FirstMatch {
    fn choose(&self, _requested: &SurfaceCaps, candidates: &[SurfaceCaps]) -> Option<usize> {
        if candidates.is_empty() {
            None
        } else {
            Some(0)
        }
    }
}

/// Picks the candidate with the smallest weighted distance from the
/// request. Ties go to the earlier (driver-preferred) candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClosestMatch;

fn abs_diff(a: u32, b: u32) -> i64 {
    (a as i64 - b as i64).abs()
}

fn score(requested: &SurfaceCaps, candidate: &SurfaceCaps) -> i64 {
    let mut s: i64 = 0;

    // Buffering mode mismatches dominate everything else.
    if candidate.double_buffered == requested.double_buffered {
        s += 1000;
    } else {
        s -= 1000;
    }
    if candidate.stereo != requested.stereo {
        s -= 1000;
    }

    s -= abs_diff(candidate.red_bits, requested.red_bits) * 8;
    s -= abs_diff(candidate.green_bits, requested.green_bits) * 8;
    s -= abs_diff(candidate.blue_bits, requested.blue_bits) * 8;
    s -= abs_diff(candidate.alpha_bits, requested.alpha_bits) * 8;
    s -= abs_diff(candidate.depth_bits, requested.depth_bits) * 4;
    s -= abs_diff(candidate.stencil_bits, requested.stencil_bits) * 2;
    s -= abs_diff(candidate.accum_red_bits, requested.accum_red_bits);
    s -= abs_diff(candidate.accum_green_bits, requested.accum_green_bits);
    s -= abs_diff(candidate.accum_blue_bits, requested.accum_blue_bits);
    s -= abs_diff(candidate.accum_alpha_bits, requested.accum_alpha_bits);

    let wanted_samples = if requested.sample_buffers {
        requested.samples
    } else {
        0
    };
    let got_samples = if candidate.sample_buffers {
        candidate.samples
    } else {
        0
    };
    s -= abs_diff(got_samples, wanted_samples) * 16;

    if requested.acceleration == Acceleration::Accelerated {
        match candidate.acceleration {
            Acceleration::Accelerated => s += 500,
            Acceleration::Software => s -= 500,
            Acceleration::Unset => {}
        }
    }

    s
}

impl CapsChooser for ClosestMatch {
    fn choose(&self, requested: &SurfaceCaps, candidates: &[SurfaceCaps]) -> Option<usize> {
        let mut best: Option<(usize, i64)> = None;
        for (i, candidate) in candidates.iter().enumerate() {
            let s = score(requested, candidate);
            match best {
                // Strict comparison keeps the earliest candidate on ties.
                Some((_, best_score)) if s <= best_score => {}
                _ => best = Some((i, s)),
            }
        }
        best.map(|(i, _)| i)
    }
}
