use crate::analysis::{Analyzer, save_history};
use crate::config::Config;
use crate::engine::{Simulator, build_pool};
use crate::generate::generate_population;
use crate::policy;
use anyhow::{Context, Result, bail};
use glob::glob;
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use std::{
    fs,
    path::{Path, PathBuf},
};

pub struct Manager {
    sim_dir: PathBuf,
    cfg: Config,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(sim_dir: P) -> Result<Self> {
        let sim_dir = sim_dir.as_ref().to_path_buf();

        let cfg = Config::from_file(sim_dir.join("config.toml")).context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        Ok(Self { sim_dir, cfg })
    }

    pub fn create_run(&self) -> Result<()> {
        let run_idx = self.count_run_dirs().context("failed to count run dirs")?;

        let run_dir = self.run_dir(run_idx);
        fs::create_dir_all(&run_dir).with_context(|| format!("failed to create {run_dir:?}"))?;
        log::info!("created {run_dir:?}");

        let seed = match self.cfg.run.seed {
            Some(seed) => seed.wrapping_add(run_idx as u64),
            None => ChaCha12Rng::try_from_os_rng()?.random(),
        };
        log::info!("seed {seed}");
        let mut rng = ChaCha12Rng::seed_from_u64(seed);

        let graph = generate_population(&self.cfg.init, &mut rng)
            .context("failed to generate population")?;
        let sim = Simulator::new(self.cfg.model.clone(), &self.cfg.run, graph, rng);

        self.run_simulation(run_idx, sim)
    }

    pub fn resume_run(&self, run_idx: usize) -> Result<()> {
        let checkpoint_file = self.checkpoint_file(run_idx);
        let sim = Simulator::load_checkpoint(&checkpoint_file)
            .with_context(|| format!("failed to load {checkpoint_file:?}"))?;
        if sim.params() != &self.cfg.model {
            bail!("checkpoint model parameters differ from the current config");
        }
        log::info!("loaded {checkpoint_file:?} at step {}", sim.step());

        if sim.is_finished() {
            log::warn!("run {run_idx} has already finished");
            return Ok(());
        }

        self.run_simulation(run_idx, sim)
    }

    fn run_simulation(&self, run_idx: usize, mut sim: Simulator) -> Result<()> {
        let pool = build_pool(self.cfg.run.n_workers)?;
        let mut policy = policy::from_config(&self.cfg.policy);
        let checkpoint_file = self.checkpoint_file(run_idx);

        while !sim.is_finished() {
            sim.advance(policy.as_mut(), &pool, self.cfg.run.steps_per_save);

            sim.save_checkpoint(&checkpoint_file)
                .context("failed to save checkpoint")?;

            let progress = 100.0 * sim.step().min(sim.max_time() + 1) as f64
                / (sim.max_time() + 1) as f64;
            log::info!("completed {progress:06.2}%");
        }

        Ok(())
    }

    pub fn analyze_sim(&self) -> Result<()> {
        let n_runs = self.count_run_dirs().context("failed to count run dirs")?;
        for run_idx in 0..n_runs {
            let checkpoint_file = self.checkpoint_file(run_idx);
            let sim = Simulator::load_checkpoint(&checkpoint_file)
                .with_context(|| format!("failed to load {checkpoint_file:?}"))?;
            if sim.history().is_empty() {
                log::warn!("run {run_idx} has no recorded steps");
                continue;
            }

            save_history(sim.history(), self.history_file(run_idx))
                .context("failed to save history")?;

            let mut analyzer = Analyzer::new();
            analyzer.add_history(sim.history());
            analyzer
                .save_results(self.results_file(run_idx))
                .context("failed to save results")?;
            log::info!("analyzed run {run_idx}");
        }

        Ok(())
    }

    pub fn clean_sim(&self) -> Result<()> {
        for run_dir in self.run_dirs().context("failed to list run dirs")? {
            fs::remove_dir_all(&run_dir).with_context(|| format!("failed to remove {run_dir:?}"))?;
            log::info!("removed {run_dir:?}");
        }
        Ok(())
    }

    fn run_dirs(&self) -> Result<Vec<PathBuf>> {
        let pattern = self.sim_dir.join("run-*");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let dirs = glob(pattern)
            .context("failed to glob run dirs")?
            .filter_map(Result::ok)
            .filter(|p| p.is_dir())
            .collect();
        Ok(dirs)
    }

    fn count_run_dirs(&self) -> Result<usize> {
        Ok(self.run_dirs()?.len())
    }

    fn run_dir(&self, run_idx: usize) -> PathBuf {
        self.sim_dir.join(format!("run-{run_idx:04}"))
    }

    fn checkpoint_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("checkpoint.msgpack")
    }

    fn history_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("history.json")
    }

    fn results_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("results.json")
    }
}
