use crate::common::progress::PixelResult;
use crate::common::scene::{Color, BLACK};

/// Running mean and variance of the samples of one pixel, following
/// [Welford's algorithm](https://en.wikipedia.org/wiki/Algorithms_for_calculating_variance#Welford's_online_algorithm).
#[derive(Debug, Default, Clone)]
pub struct ColorVarianceEstimator {
    pub count: u32,
    pub mean: Color,
    m2: Color,
}

impl ColorVarianceEstimator {
    pub fn update(&mut self, value: Color) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / (self.count as f32);
        let delta_2 = value - self.mean;
        self.m2 += delta * delta_2;
    }

    /// Population variance, only defined once two samples have been seen.
    pub fn variance(&self) -> Option<Color> {
        (self.count >= 2).then(|| self.m2 / (self.count as f32))
    }

    pub fn result(&self) -> PixelResult {
        PixelResult {
            color: self.mean,
            variance: self.variance().unwrap_or(BLACK),
            samples: self.count,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn matches_batch_statistics() {
        let xs = [0.5, 0.1, 0.4, 0.8, 0.3, 0.9, 0.8, 0.4, 0.2];
        let mut estimator = ColorVarianceEstimator::default();
        for &x in &xs {
            estimator.update(Color::new(0.0, x, 0.0));
        }

        let n = xs.len() as f32;
        let mean = xs.iter().sum::<f32>() / n;
        let variance = xs.iter().map(|&x| (x - mean).powi(2)).sum::<f32>() / n;

        let result = estimator.result();
        assert_eq!(xs.len() as u32, result.samples);
        assert!((result.color.green - mean).abs() < 1e-5);
        assert!((result.variance.green - variance).abs() < 1e-5);
        assert_eq!(0.0, result.variance.red);
    }

    #[test]
    fn single_sample_has_no_variance() {
        let mut estimator = ColorVarianceEstimator::default();
        estimator.update(Color::new(1.0, 1.0, 1.0));
        assert!(estimator.variance().is_none());
        assert_eq!(BLACK, estimator.result().variance);
    }
}
