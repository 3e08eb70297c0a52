use crate::config::PolicyConfig;
use crate::graph::Graph;
use crate::model::Agent;

/// Population-level intervention applied once per step, after both phases.
///
/// May rewrite behavioural flags and idea vectors; never touches the topology.
pub trait InterventionPolicy {
    fn apply(&mut self, step: usize, graph: &mut Graph);
}

pub struct NoIntervention;

impl InterventionPolicy for NoIntervention {
    fn apply(&mut self, _step: usize, _graph: &mut Graph) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    Mask,
    Distancing,
    Vaccination,
}

/// Forces one behaviour on every living real agent during `start <= step < end`.
pub struct Mandate {
    behaviour: Behaviour,
    start: usize,
    end: usize,
}

impl Mandate {
    pub fn new(behaviour: Behaviour, start: usize, end: usize) -> Self {
        Self {
            behaviour,
            start,
            end,
        }
    }
}

impl InterventionPolicy for Mandate {
    fn apply(&mut self, step: usize, graph: &mut Graph) {
        if !(self.start..self.end).contains(&step) {
            return;
        }
        let targets = graph
            .agents_mut()
            .iter_mut()
            .filter(|agent| !agent.is_virtual() && agent.is_alive());
        for agent in targets {
            enforce(agent, self.behaviour);
        }
    }
}

fn enforce(agent: &mut Agent, behaviour: Behaviour) {
    match behaviour {
        Behaviour::Mask => agent.set_wearing_mask(true),
        Behaviour::Distancing => agent.set_social_distancing(true),
        Behaviour::Vaccination => agent.set_vaccinated(true),
    }
}

/// Build the policy described by the configuration.
pub fn from_config(cfg: &PolicyConfig) -> Box<dyn InterventionPolicy> {
    match *cfg {
        PolicyConfig::None => Box::new(NoIntervention),
        PolicyConfig::MaskMandate { start, end } => Box::new(Mandate::new(Behaviour::Mask, start, end)),
        PolicyConfig::DistancingMandate { start, end } => {
            Box::new(Mandate::new(Behaviour::Distancing, start, end))
        }
        PolicyConfig::VaccinationCampaign { start, end } => {
            Box::new(Mandate::new(Behaviour::Vaccination, start, end))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EpiState, PERSONALITY_SIZE};

    fn population() -> Graph {
        let agents = vec![
            Agent::new(0, EpiState::S, [0.5; PERSONALITY_SIZE], [0.0; 3]),
            Agent::new(1, EpiState::D, [0.5; PERSONALITY_SIZE], [0.0; 3]),
            Agent::new_virtual(2, [0.5; PERSONALITY_SIZE], [0.0; 3]),
        ];
        Graph::new(agents, Vec::new(), Vec::new()).unwrap()
    }

    #[test]
    fn mandate_only_acts_inside_window() {
        let mut graph = population();
        let mut policy = from_config(&PolicyConfig::MaskMandate { start: 3, end: 5 });

        policy.apply(2, &mut graph);
        assert!(!graph.agents()[0].wearing_mask());

        policy.apply(3, &mut graph);
        assert!(graph.agents()[0].wearing_mask());
        assert!(!graph.agents()[1].wearing_mask());
        assert!(!graph.agents()[2].wearing_mask());
    }

    #[test]
    fn campaign_marks_agents_vaccinated() {
        let mut graph = population();
        let mut policy = from_config(&PolicyConfig::VaccinationCampaign { start: 0, end: 1 });
        policy.apply(0, &mut graph);
        assert!(graph.agents()[0].vaccinated());
        assert!(!graph.agents()[0].social_distancing());
    }

    #[test]
    fn no_intervention_leaves_graph_alone() {
        let mut graph = population();
        let before = graph.agents().to_vec();
        NoIntervention.apply(0, &mut graph);
        assert_eq!(graph.agents(), before.as_slice());
    }
}
