use serde::{Deserialize, Serialize};

/// Streaming mean and variance (Welford).
#[derive(Debug, Default, Clone)]
pub struct Accumulator {
    n_vals: usize,
    mean: f64,
    diff_2_sum: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccumulatorReport {
    pub mean: f64,
    pub std_dev: f64,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, val: f64) {
        self.n_vals += 1;

        let diff_a = val - self.mean;
        self.mean += diff_a / self.n_vals as f64;

        let diff_b = val - self.mean;
        self.diff_2_sum += diff_a * diff_b;
    }

    /// Mean and population standard deviation; both NaN when empty.
    pub fn report(&self) -> AccumulatorReport {
        if self.n_vals == 0 {
            return AccumulatorReport {
                mean: f64::NAN,
                std_dev: f64::NAN,
            };
        }
        AccumulatorReport {
            mean: self.mean,
            std_dev: (self.diff_2_sum / self.n_vals as f64).sqrt(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_direct_computation() {
        let vals = [0.2, 0.4, 0.9, 0.1];
        let mut acc = Accumulator::new();
        vals.iter().for_each(|&val| acc.add(val));

        let mean = vals.iter().sum::<f64>() / 4.0;
        let var = vals.iter().map(|val| (val - mean).powi(2)).sum::<f64>() / 4.0;
        let report = acc.report();
        assert!((report.mean - mean).abs() < 1e-12);
        assert!((report.std_dev - var.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn empty_report_is_nan() {
        let report = Accumulator::new().report();
        assert!(report.mean.is_nan());
        assert!(report.std_dev.is_nan());
    }
}
