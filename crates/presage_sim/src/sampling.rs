//! Stride-based trial sampling.
//!
//! Selection is independent of, and applied after, trajectory simulation:
//! the full trajectory is always computed because later arousal levels
//! depend on earlier, unsampled trials.

use presage_core::SimConfig;

/// Which 1-based trial positions are included in statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleFilter {
    start: usize,
    stride: usize,
}

impl SampleFilter {
    pub fn from_config(config: &SimConfig) -> Self {
        Self {
            start: config.sample_start,
            stride: config.sample_stride,
        }
    }

    /// A position is sampled iff it is at least `start` and lies on the
    /// stride grid anchored there.
    pub fn includes(&self, position: usize) -> bool {
        position >= self.start && (position - self.start) % self.stride == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_includes_everything() {
        let f = SampleFilter::from_config(&SimConfig::default());
        assert!((1..=10).all(|p| f.includes(p)));
    }

    #[test]
    fn test_start_skips_leading_trials() {
        let cfg = SimConfig {
            sample_start: 3,
            ..SimConfig::default()
        };
        let f = SampleFilter::from_config(&cfg);
        assert!(!f.includes(1));
        assert!(!f.includes(2));
        assert!((3..=8).all(|p| f.includes(p)));
    }

    #[test]
    fn test_stride_grid() {
        let cfg = SimConfig {
            sample_start: 2,
            sample_stride: 2,
            ..SimConfig::default()
        };
        let f = SampleFilter::from_config(&cfg);
        let included: Vec<usize> = (1..=8).filter(|&p| f.includes(p)).collect();
        assert_eq!(included, vec![2, 4, 6, 8]);
    }
}
