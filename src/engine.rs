use crate::config::{ModelParams, RunParams};
use crate::epidemic;
use crate::error::SnapshotLoadError;
use crate::graph::Graph;
use crate::history::{History, Record};
use crate::model::{EpiState, EpiStatus, Ideas};
use crate::policy::InterventionPolicy;
use crate::social;
use anyhow::{Context, Result};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use rmp_serde::{decode, encode};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

/// Simulation engine.
///
/// Holds the model constants, the population graph, the recorded history
/// and the master random number generator. Serializes as a whole, so a
/// checkpoint resumes a run from the exact step it was saved at.
#[derive(Serialize, Deserialize)]
pub struct Simulator {
    params: ModelParams,
    graph: Graph,
    step: usize,
    max_time: usize,
    stop_early: bool,
    finished: bool,
    history: History,
    rng: ChaCha12Rng,
}

impl Simulator {
    pub fn new(params: ModelParams, run: &RunParams, graph: Graph, rng: ChaCha12Rng) -> Self {
        Self {
            params,
            graph,
            step: 0,
            max_time: run.max_time,
            stop_early: run.stop_early,
            finished: false,
            history: History::default(),
            rng,
        }
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn max_time(&self) -> usize {
        self.max_time
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn is_finished(&self) -> bool {
        self.finished || self.step > self.max_time
    }

    /// Run until `max_time` or, with early stopping, until nobody is infectious.
    pub fn run(&mut self, policy: &mut dyn InterventionPolicy, pool: &ThreadPool) {
        self.advance(policy, pool, usize::MAX);
    }

    /// Run at most `n_steps` steps, stopping earlier if the run finishes.
    ///
    /// Without early stopping, an outbreak that dies out before `max_time`
    /// has its last record repeated so the history always spans `max_time + 1` steps.
    pub fn advance(
        &mut self,
        policy: &mut dyn InterventionPolicy,
        pool: &ThreadPool,
        n_steps: usize,
    ) {
        for _ in 0..n_steps {
            if self.is_finished() {
                break;
            }

            self.perform_step(policy, pool);

            let outbreak_over = self
                .history
                .last()
                .is_some_and(|record| record.infectious() == 0);
            if outbreak_over {
                log::info!("no infectious agents left after step {}", self.step - 1);
                if !self.stop_early {
                    self.history.extend_last(self.max_time + 1);
                    self.step = self.history.len();
                }
                self.finished = true;
            }
        }
    }

    /// Perform one step: epidemic phase, social phase, intervention, aggregation.
    pub fn perform_step(&mut self, policy: &mut dyn InterventionPolicy, pool: &ThreadPool) {
        self.epidemiological(pool);

        self.social(pool);

        policy.apply(self.step, &mut self.graph);

        let record = Record::gather(&self.graph);
        log::debug!("step {}: {:?}", self.step, record.state_counts);
        self.history.push(record);

        self.step += 1;
    }

    fn epidemiological(&mut self, pool: &ThreadPool) {
        let phase_seed: u64 = self.rng.random();
        let graph = &self.graph;
        let params = &self.params;

        let mut updates: Vec<(usize, EpiStatus)> = pool.install(|| {
            graph
                .agents()
                .par_iter()
                .filter(|agent| !agent.is_virtual())
                .map(|agent| {
                    let mut rng = ChaCha12Rng::seed_from_u64(phase_seed);
                    rng.set_stream(agent.id() as u64);
                    (agent.id(), epidemic::transition(agent, graph, params, &mut rng))
                })
                .collect()
        });
        updates.sort_unstable_by_key(|&(id, _)| id);

        let mut dead_ids = Vec::new();
        let agents = self.graph.agents_mut();
        for (id, epi) in updates {
            let agent = &mut agents[id];
            if agent.is_alive() && epi.state == EpiState::D {
                dead_ids.push(id);
            }
            agent.set_epi(epi);
        }

        if !dead_ids.is_empty() {
            log::debug!("step {}: agents {:?} died", self.step, dead_ids);
            self.graph.remove_agents_edges(&dead_ids);
        }
    }

    fn social(&mut self, pool: &ThreadPool) {
        let graph = &self.graph;
        let params = &self.params;

        let mut updates: Vec<(usize, Ideas)> = pool.install(|| {
            graph
                .agents()
                .par_iter()
                .filter(|agent| !agent.is_virtual())
                .map(|agent| (agent.id(), social::diffuse(agent, graph, params)))
                .collect()
        });
        updates.sort_unstable_by_key(|&(id, _)| id);

        let agents = self.graph.agents_mut();
        for (id, ideas) in updates {
            agents[id].set_ideas(ideas);
        }
    }

    /// Save a checkpoint of the entire simulator.
    ///
    /// Can be used to resume the simulation later.
    pub fn save_checkpoint<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);
        encode::write(&mut writer, &self).context("failed to serialize simulator")?;
        writer.flush().context("failed to flush writer stream")?;
        Ok(())
    }

    /// Load a previously saved checkpoint.
    pub fn load_checkpoint<P: AsRef<Path>>(file: P) -> Result<Self, SnapshotLoadError> {
        let path = file.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| SnapshotLoadError::Io {
            path: path.clone(),
            source,
        })?;
        let mut reader = BufReader::new(file);
        let sim: Simulator =
            decode::from_read(&mut reader).map_err(|source| SnapshotLoadError::Decode {
                path: path.clone(),
                source,
            })?;
        sim.check_consistency()
            .map_err(|reason| SnapshotLoadError::Inconsistent { path, reason })?;
        Ok(sim)
    }

    fn check_consistency(&self) -> Result<(), String> {
        if !self.history.is_consistent() {
            return Err("history series have different lengths".to_string());
        }
        if self.history.len() != self.step {
            return Err(format!(
                "history holds {} records but the step counter is {}",
                self.history.len(),
                self.step
            ));
        }
        if let Err(err) = self.params.validate() {
            return Err(format!("invalid model parameters: {err:#}"));
        }
        Ok(())
    }
}

/// Build the worker pool shared by both phases.
pub fn build_pool(n_workers: usize) -> Result<ThreadPool> {
    ThreadPoolBuilder::new()
        .num_threads(n_workers)
        .build()
        .context("failed to build worker pool")
}
