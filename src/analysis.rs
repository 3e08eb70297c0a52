use crate::history::{History, Record};
use crate::model::{EpiState, IDEAS_SIZE};
use crate::stats::Accumulator;
use anyhow::{Context, Result};
use std::{fs::File, io::BufWriter, path::Path};

pub trait Obs {
    fn update(&mut self, step: usize, record: &Record);
    fn report(&self) -> serde_json::Value;
}

/// Largest number of simultaneously infectious agents.
#[derive(Default)]
pub struct PeakInfected {
    peak: usize,
    peak_step: usize,
    population: usize,
}

impl Obs for PeakInfected {
    fn update(&mut self, step: usize, record: &Record) {
        self.population = record.population();
        if record.infectious() > self.peak {
            self.peak = record.infectious();
            self.peak_step = step;
        }
    }

    fn report(&self) -> serde_json::Value {
        let portion = if self.population > 0 {
            self.peak as f64 / self.population as f64
        } else {
            f64::NAN
        };
        serde_json::json!({
            "peak_infected": self.peak,
            "peak_step": self.peak_step,
            "peak_infected_portion": portion,
        })
    }
}

/// Mean reproduction number estimated from consecutive steps.
///
/// Each step contributes the change in infectious agents divided by the change
/// in recovered agents, or the raw change when nobody recovered.
#[derive(Default)]
pub struct MeanRZero {
    prev: Option<Record>,
    acc: Accumulator,
}

impl Obs for MeanRZero {
    fn update(&mut self, _step: usize, record: &Record) {
        if let Some(prev) = self.prev {
            let d_infectious = record.infectious() as f64 - prev.infectious() as f64;
            let d_recovered = record.recovered() as f64 - prev.recovered() as f64;
            self.acc.add(if d_recovered != 0.0 {
                d_infectious / d_recovered
            } else {
                d_infectious
            });
        }
        self.prev = Some(*record);
    }

    fn report(&self) -> serde_json::Value {
        serde_json::json!({ "mean_r_zero": self.acc.report() })
    }
}

/// Final compartment sizes and idea averages.
#[derive(Default)]
pub struct FinalState {
    last: Option<Record>,
}

impl Obs for FinalState {
    fn update(&mut self, _step: usize, record: &Record) {
        self.last = Some(*record);
    }

    fn report(&self) -> serde_json::Value {
        match &self.last {
            Some(record) => serde_json::json!({
                "death_toll": record.count(EpiState::D),
                "final_state_counts": record.state_counts,
                "final_idea_mean": record.idea_mean,
            }),
            None => {
                let idea_mean = [f64::NAN; IDEAS_SIZE];
                serde_json::json!({
                    "death_toll": 0,
                    "final_idea_mean": idea_mean,
                })
            }
        }
    }
}

pub struct Analyzer {
    obs_ptr_vec: Vec<Box<dyn Obs>>,
}

impl Analyzer {
    pub fn new() -> Self {
        let obs_ptr_vec: Vec<Box<dyn Obs>> = vec![
            Box::new(PeakInfected::default()),
            Box::new(MeanRZero::default()),
            Box::new(FinalState::default()),
        ];
        Self { obs_ptr_vec }
    }

    pub fn add_history(&mut self, history: &History) {
        for (step, record) in history.records().enumerate() {
            for obs in &mut self.obs_ptr_vec {
                obs.update(step, &record);
            }
        }
    }

    pub fn reports(&self) -> Vec<serde_json::Value> {
        self.obs_ptr_vec.iter().map(|obs| obs.report()).collect()
    }

    pub fn save_results<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let writer = BufWriter::new(file);

        serde_json::to_writer_pretty(writer, &self.reports()).context("failed to write results")?;
        Ok(())
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Write the raw per-step history for downstream plotting.
pub fn save_history<P: AsRef<Path>>(history: &History, file: P) -> Result<()> {
    let file = file.as_ref();
    let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, history).context("failed to write history")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(counts: [usize; 7]) -> Record {
        Record {
            state_counts: counts,
            idea_mean: [0.5; IDEAS_SIZE],
            idea_std: [0.0; IDEAS_SIZE],
        }
    }

    fn history() -> History {
        let mut history = History::default();
        //             S  E Ia Is Rf Rp  D
        history.push(record([8, 0, 1, 1, 0, 0, 0]));
        history.push(record([6, 0, 2, 2, 0, 0, 0]));
        history.push(record([6, 0, 1, 1, 2, 0, 0]));
        history.push(record([6, 0, 0, 0, 3, 0, 1]));
        history
    }

    #[test]
    fn peak_is_found() {
        let mut obs = PeakInfected::default();
        for (step, rec) in history().records().enumerate() {
            obs.update(step, &rec);
        }
        let report = obs.report();
        assert_eq!(report["peak_infected"], 4);
        assert_eq!(report["peak_step"], 1);
        assert_eq!(report["peak_infected_portion"], 0.4);
    }

    #[test]
    fn r_zero_averages_step_ratios() {
        let mut obs = MeanRZero::default();
        for (step, rec) in history().records().enumerate() {
            obs.update(step, &rec);
        }
        // Steps contribute 2 (no recoveries), -2 / 2 and -2 / 1.
        let expected = (2.0 - 1.0 - 2.0) / 3.0;
        let mean = obs.report()["mean_r_zero"]["mean"].as_f64().unwrap();
        assert!((mean - expected).abs() < 1e-12);
    }

    #[test]
    fn analyzer_reports_every_observable() {
        let mut analyzer = Analyzer::new();
        analyzer.add_history(&history());
        let reports = analyzer.reports();
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[2]["death_toll"], 1);
    }

    #[test]
    fn empty_history_reports_missing_ideas() {
        let mut analyzer = Analyzer::new();
        analyzer.add_history(&History::default());
        let reports = analyzer.reports();
        assert_eq!(reports[2]["death_toll"], 0);
        let idea_mean = reports[2]["final_idea_mean"].as_array().unwrap();
        assert_eq!(idea_mean.len(), IDEAS_SIZE);
        assert!(idea_mean.iter().all(serde_json::Value::is_null));
    }
}
