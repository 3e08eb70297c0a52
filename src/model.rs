//! Agents, edges and epidemiological states.

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Length of the personality vector.
pub const PERSONALITY_SIZE: usize = 10;
/// Length of the idea vector: mask, distancing and vaccination signals.
pub const IDEAS_SIZE: usize = 3;
/// Number of epidemiological states.
pub const STATE_COUNT: usize = 7;

const MASK_IDEA: usize = 0;
const DISTANCING_IDEA: usize = 1;
const VACCINATION_IDEA: usize = 2;
const ADOPTION_THRESHOLD: f64 = 0.5;

pub type Ideas = [f64; IDEAS_SIZE];
pub type Personality = [f64; PERSONALITY_SIZE];

/// Epidemiological compartment. `D` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EpiState {
    S,
    E,
    Ia,
    Is,
    Rf,
    Rp,
    D,
}

impl EpiState {
    /// Position of the state in per-state count vectors.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_infectious(self) -> bool {
        matches!(self, EpiState::Ia | EpiState::Is)
    }
}

/// Epidemiological part of an agent, owned by one worker during the epidemic phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpiStatus {
    pub state: EpiState,
    /// Steps spent in the current state.
    pub timer: u32,
    /// Steps lived since the start of the run; never reset.
    pub clock: u32,
    pub vaccine_count: u32,
    /// Value of `clock` at the last dose.
    pub last_vaccination_time: u32,
}

impl EpiStatus {
    pub fn new(state: EpiState) -> Self {
        Self {
            state,
            timer: 0,
            clock: 0,
            vaccine_count: 0,
            last_vaccination_time: 0,
        }
    }

    pub fn tic(&mut self) {
        self.timer += 1;
        self.clock += 1;
    }

    /// Steps since the last dose.
    pub fn since_vaccination(&self) -> u32 {
        self.clock.saturating_sub(self.last_vaccination_time)
    }

    pub fn set_state(&mut self, state: EpiState) {
        self.state = state;
        self.timer = 0;
    }
}

/// Agent of the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    id: usize,
    epi: EpiStatus,
    personality: Personality,
    ideas: Ideas,
    is_virtual: bool,
    wearing_mask: bool,
    social_distancing: bool,
    vaccinated: bool,
}

impl Agent {
    /// Create a real agent whose behaviours follow its ideas.
    pub fn new(id: usize, state: EpiState, personality: Personality, ideas: Ideas) -> Self {
        let mut agent = Self {
            id,
            epi: EpiStatus::new(state),
            personality,
            ideas,
            is_virtual: false,
            wearing_mask: false,
            social_distancing: false,
            vaccinated: false,
        };
        agent.set_ideas(ideas);
        agent
    }

    /// Create a virtual agent: a fixed opinion source outside the epidemic.
    pub fn new_virtual(id: usize, personality: Personality, ideas: Ideas) -> Self {
        Self {
            is_virtual: true,
            ..Self::new(id, EpiState::S, personality, ideas)
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn epi(&self) -> &EpiStatus {
        &self.epi
    }

    pub fn state(&self) -> EpiState {
        self.epi.state
    }

    pub fn personality(&self) -> &Personality {
        &self.personality
    }

    pub fn ideas(&self) -> &Ideas {
        &self.ideas
    }

    pub fn is_virtual(&self) -> bool {
        self.is_virtual
    }

    pub fn is_alive(&self) -> bool {
        self.epi.state != EpiState::D
    }

    pub fn wearing_mask(&self) -> bool {
        self.wearing_mask
    }

    pub fn social_distancing(&self) -> bool {
        self.social_distancing
    }

    pub fn vaccinated(&self) -> bool {
        self.vaccinated
    }

    pub(crate) fn set_epi(&mut self, epi: EpiStatus) {
        self.epi = epi;
    }

    /// Replace the idea vector and re-derive the behavioural flags from it.
    pub fn set_ideas(&mut self, ideas: Ideas) {
        self.ideas = ideas;
        self.wearing_mask = ideas[MASK_IDEA] > ADOPTION_THRESHOLD;
        self.social_distancing = ideas[DISTANCING_IDEA] > ADOPTION_THRESHOLD;
        self.vaccinated = ideas[VACCINATION_IDEA] > ADOPTION_THRESHOLD;
    }

    pub fn set_wearing_mask(&mut self, value: bool) {
        self.wearing_mask = value;
    }

    pub fn set_social_distancing(&mut self, value: bool) {
        self.social_distancing = value;
    }

    pub fn set_vaccinated(&mut self, value: bool) {
        self.vaccinated = value;
    }
}

/// Directed weighted arc. Identity is the `(source, target)` pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Edge {
    pub source_id: usize,
    pub target_id: usize,
    pub weight: i64,
}

impl Edge {
    pub fn new(source_id: usize, target_id: usize, weight: i64) -> Self {
        Self {
            source_id,
            target_id,
            weight,
        }
    }

    pub fn touches(&self, id: usize) -> bool {
        self.source_id == id || self.target_id == id
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.source_id == other.source_id && self.target_id == other.target_id
    }
}

impl Eq for Edge {}

impl Hash for Edge {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.source_id, self.target_id).hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn behaviours_follow_ideas() {
        let mut agent = Agent::new(0, EpiState::S, [0.5; PERSONALITY_SIZE], [0.6, 0.5, 0.9]);
        assert!(agent.wearing_mask());
        assert!(!agent.social_distancing());
        assert!(agent.vaccinated());

        agent.set_ideas([0.1, 0.7, 0.2]);
        assert!(!agent.wearing_mask());
        assert!(agent.social_distancing());
        assert!(!agent.vaccinated());
    }

    #[test]
    fn state_change_resets_timer() {
        let mut epi = EpiStatus::new(EpiState::S);
        epi.tic();
        epi.tic();
        assert_eq!(epi.timer, 2);
        epi.set_state(EpiState::E);
        assert_eq!(epi.timer, 0);
        assert_eq!(epi.clock, 2);
    }

    #[test]
    fn edge_identity_ignores_weight() {
        assert_eq!(Edge::new(1, 2, 1), Edge::new(1, 2, 5));
        assert_ne!(Edge::new(1, 2, 1), Edge::new(2, 1, 1));
    }
}
