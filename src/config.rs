use crate::model::IDEAS_SIZE;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Simulation configuration.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Epidemiological and social model constants.
    pub model: ModelParams,
    /// Population and topology generation.
    pub init: InitParams,
    /// Run control.
    pub run: RunParams,
    /// Intervention policy applied once per step.
    #[serde(default)]
    pub policy: PolicyConfig,
}

/// Model constants, read-only for the whole run.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ModelParams {
    /// Infection probability per contact.
    pub beta: f64,
    /// Incubation duration.
    pub phi: u32,
    /// Probability that an exposed agent becomes symptomatic.
    pub eta: f64,
    /// Recovery duration of asymptomatic agents.
    pub gamma_a: u32,
    /// Recovery duration of symptomatic agents.
    pub gamma_s: u32,
    /// Outcome thresholds: `(psi_2, psi_3]` dies, `(psi_1, psi_2]` recovers partially.
    pub psi_1: f64,
    pub psi_2: f64,
    pub psi_3: f64,
    /// Immunity duration after full recovery.
    pub chi_f: u32,
    /// Immunity duration after partial recovery.
    pub chi_p: u32,
    /// Risk factor when only the susceptible agent wears a mask.
    pub mask_s_reduce_factor: f64,
    /// Risk factor when only the contact wears a mask.
    pub mask_i_reduce_factor: f64,
    /// Risk factor when both wear masks.
    pub mask_si_reduce_factor: f64,
    /// Risk factor when either party practices social distancing.
    pub social_distance_reduce_factor: f64,
    /// Idea diffusion rate.
    pub lambda: f64,
    pub ideas_reject: f64,
    pub personality_reject: f64,
    /// Minimum time between two vaccine doses.
    pub vaccinate_delta_time: u32,
}

/// Population generation parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct InitParams {
    pub topology: Topology,
    /// Probability that a real agent starts infectious.
    pub initial_infected: f64,
    /// Number of virtual influence sources.
    #[serde(default)]
    pub n_virtual: usize,
    /// Fixed idea vector of every virtual agent.
    #[serde(default)]
    pub virtual_ideas: [f64; IDEAS_SIZE],
    /// Number of real agents each virtual agent influences.
    #[serde(default)]
    pub virtual_reach: usize,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Topology {
    Random {
        n_agents: usize,
        n_epi_edges: usize,
        n_social_edges: usize,
    },
    FullyConnected {
        n_agents: usize,
    },
}

impl Topology {
    pub fn n_agents(&self) -> usize {
        match *self {
            Topology::Random { n_agents, .. } => n_agents,
            Topology::FullyConnected { n_agents } => n_agents,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct RunParams {
    /// Last step to simulate (inclusive).
    pub max_time: usize,
    /// Stop as soon as nobody is infectious.
    #[serde(default)]
    pub stop_early: bool,
    /// Width of the worker pool.
    #[serde(default = "default_n_workers")]
    pub n_workers: usize,
    /// Master seed; drawn from the OS when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Number of steps between checkpoints.
    pub steps_per_save: usize,
}

fn default_n_workers() -> usize {
    8
}

/// Intervention policy variants.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicyConfig {
    #[default]
    None,
    MaskMandate {
        start: usize,
        end: usize,
    },
    DistancingMandate {
        start: usize,
        end: usize,
    },
    VaccinationCampaign {
        start: usize,
        end: usize,
    },
}

impl Config {
    /// Load a [`Config`] from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents = fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        let config: Config = toml::from_str(&contents).context("failed to parse config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.model.validate().context("invalid model parameters")?;
        self.init.validate().context("invalid init parameters")?;
        self.run.validate().context("invalid run parameters")?;
        self.policy.validate().context("invalid policy")?;
        Ok(())
    }
}

impl ModelParams {
    pub fn validate(&self) -> Result<()> {
        check_num(self.beta, 0.0..=1.0).context("invalid beta")?;
        check_num(self.eta, 0.0..=1.0).context("invalid eta")?;
        check_num(self.phi, 0..100_000).context("invalid phi")?;
        check_num(self.gamma_a, 0..100_000).context("invalid gamma_a")?;
        check_num(self.gamma_s, 0..100_000).context("invalid gamma_s")?;
        check_num(self.chi_f, 0..100_000).context("invalid chi_f")?;
        check_num(self.chi_p, 0..100_000).context("invalid chi_p")?;

        check_num(self.psi_1, 0.0..=1.0).context("invalid psi_1")?;
        check_num(self.psi_2, 0.0..=1.0).context("invalid psi_2")?;
        if !(self.psi_1 < self.psi_2 && self.psi_2 < self.psi_3) {
            bail!("outcome thresholds must satisfy psi_1 < psi_2 < psi_3");
        }
        if self.psi_3 != 1.0 {
            bail!("psi_3 must be 1.0, but is {}", self.psi_3);
        }

        check_num(self.mask_s_reduce_factor, 0.0..=1.0).context("invalid mask_s_reduce_factor")?;
        check_num(self.mask_i_reduce_factor, 0.0..=1.0).context("invalid mask_i_reduce_factor")?;
        check_num(self.mask_si_reduce_factor, 0.0..=1.0)
            .context("invalid mask_si_reduce_factor")?;
        check_num(self.social_distance_reduce_factor, 0.0..=1.0)
            .context("invalid social_distance_reduce_factor")?;

        check_num(self.lambda, 0.0..=1.0).context("invalid lambda")?;
        check_num(self.ideas_reject, 0.0..=1.0).context("invalid ideas_reject")?;
        check_num(self.personality_reject, 0.0..=1.0).context("invalid personality_reject")?;
        Ok(())
    }
}

impl InitParams {
    fn validate(&self) -> Result<()> {
        let n_agents = self.topology.n_agents();
        check_num(n_agents, 1..1_000_000).context("invalid number of agents")?;
        if let Topology::Random {
            n_epi_edges,
            n_social_edges,
            ..
        } = self.topology
        {
            let max_edges = n_agents * (n_agents - 1);
            check_num(n_epi_edges, 0..=max_edges).context("invalid number of epidemiological edges")?;
            check_num(n_social_edges, 0..=max_edges).context("invalid number of social edges")?;
        }
        check_num(self.initial_infected, 0.0..=1.0).context("invalid initial infected probability")?;
        check_num(self.virtual_reach, 0..=n_agents).context("invalid virtual reach")?;
        check_vec(&self.virtual_ideas).context("invalid virtual ideas")?;
        Ok(())
    }
}

impl RunParams {
    fn validate(&self) -> Result<()> {
        check_num(self.max_time, 0..1_000_000).context("invalid max time")?;
        check_num(self.n_workers, 1..1024).context("invalid number of workers")?;
        check_num(self.steps_per_save, 1..1_000_000).context("invalid number of steps per save")?;
        Ok(())
    }
}

impl PolicyConfig {
    fn validate(&self) -> Result<()> {
        match *self {
            PolicyConfig::None => Ok(()),
            PolicyConfig::MaskMandate { start, end }
            | PolicyConfig::DistancingMandate { start, end }
            | PolicyConfig::VaccinationCampaign { start, end } => {
                if start > end {
                    bail!("policy start ({start}) must not exceed its end ({end})");
                }
                Ok(())
            }
        }
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

fn check_vec(vec: &[f64]) -> Result<()> {
    for (i_ele, &ele) in vec.iter().enumerate() {
        check_num(ele, 0.0..=1.0).with_context(|| format!("invalid element {i_ele}"))?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn model_params() -> ModelParams {
        ModelParams {
            beta: 0.027,
            phi: 8,
            eta: 0.2,
            gamma_a: 8,
            gamma_s: 14,
            psi_1: 0.96,
            psi_2: 0.99,
            psi_3: 1.0,
            chi_f: 45,
            chi_p: 28,
            mask_s_reduce_factor: 0.15,
            mask_i_reduce_factor: 0.6,
            mask_si_reduce_factor: 0.84,
            social_distance_reduce_factor: 0.33,
            lambda: 0.02,
            ideas_reject: 0.25,
            personality_reject: 0.25,
            vaccinate_delta_time: 90,
        }
    }

    const CONFIG: &str = r#"
[model]
beta = 0.027
phi = 8
eta = 0.2
gamma_a = 8
gamma_s = 14
psi_1 = 0.96
psi_2 = 0.99
psi_3 = 1.0
chi_f = 45
chi_p = 28
mask_s_reduce_factor = 0.15
mask_i_reduce_factor = 0.6
mask_si_reduce_factor = 0.84
social_distance_reduce_factor = 0.33
lambda = 0.02
ideas_reject = 0.25
personality_reject = 0.25
vaccinate_delta_time = 90

[init]
topology = { kind = "random", n_agents = 50, n_epi_edges = 500, n_social_edges = 800 }
initial_infected = 0.1

[run]
max_time = 30
steps_per_save = 10

[policy]
kind = "mask_mandate"
start = 5
end = 20
"#;

    #[test]
    fn parses_and_fills_defaults() {
        let cfg: Config = toml::from_str(CONFIG).unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.model, model_params());
        assert_eq!(cfg.run.n_workers, 8);
        assert_eq!(cfg.run.seed, None);
        assert!(!cfg.run.stop_early);
        assert_eq!(cfg.init.n_virtual, 0);
        assert_eq!(cfg.policy, PolicyConfig::MaskMandate { start: 5, end: 20 });
    }

    #[test]
    fn rejects_unordered_outcome_thresholds() {
        let mut params = model_params();
        params.psi_1 = 0.995;
        assert!(params.validate().is_err());
    }

    #[test]
    fn rejects_infeasible_edge_count() {
        let mut cfg: Config = toml::from_str(CONFIG).unwrap();
        cfg.init.topology = Topology::Random {
            n_agents: 3,
            n_epi_edges: 7,
            n_social_edges: 0,
        };
        assert!(cfg.validate().is_err());
    }
}
