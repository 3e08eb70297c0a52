//! Per-step aggregates recorded by the simulator.

use crate::graph::Graph;
use crate::model::{EpiState, IDEAS_SIZE, Ideas, STATE_COUNT};
use crate::stats::Accumulator;
use serde::{Deserialize, Serialize};

pub type StateCounts = [usize; STATE_COUNT];

/// Aggregates of one step, over real agents only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub state_counts: StateCounts,
    pub idea_mean: Ideas,
    pub idea_std: Ideas,
}

impl Record {
    pub fn gather(graph: &Graph) -> Self {
        let mut state_counts = [0; STATE_COUNT];
        let mut acc_vec: [Accumulator; IDEAS_SIZE] = Default::default();

        for agent in graph.agents().iter().filter(|agent| !agent.is_virtual()) {
            state_counts[agent.state().index()] += 1;
            for (acc, &idea) in acc_vec.iter_mut().zip(agent.ideas()) {
                acc.add(idea);
            }
        }

        let reports = acc_vec.map(|acc| acc.report());
        Self {
            state_counts,
            idea_mean: reports.map(|report| report.mean),
            idea_std: reports.map(|report| report.std_dev),
        }
    }

    pub fn count(&self, state: EpiState) -> usize {
        self.state_counts[state.index()]
    }

    pub fn infectious(&self) -> usize {
        self.count(EpiState::Ia) + self.count(EpiState::Is)
    }

    pub fn recovered(&self) -> usize {
        self.count(EpiState::Rf) + self.count(EpiState::Rp)
    }

    pub fn population(&self) -> usize {
        self.state_counts.iter().sum()
    }
}

/// Time series of per-step aggregates, one entry per simulated step.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct History {
    pub state_counts: Vec<StateCounts>,
    pub idea_mean: Vec<Ideas>,
    pub idea_std: Vec<Ideas>,
}

impl History {
    pub fn push(&mut self, record: Record) {
        self.state_counts.push(record.state_counts);
        self.idea_mean.push(record.idea_mean);
        self.idea_std.push(record.idea_std);
    }

    pub fn len(&self) -> usize {
        self.state_counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state_counts.is_empty()
    }

    pub fn get(&self, step: usize) -> Option<Record> {
        Some(Record {
            state_counts: *self.state_counts.get(step)?,
            idea_mean: *self.idea_mean.get(step)?,
            idea_std: *self.idea_std.get(step)?,
        })
    }

    pub fn last(&self) -> Option<Record> {
        self.len().checked_sub(1).and_then(|step| self.get(step))
    }

    pub fn records(&self) -> impl Iterator<Item = Record> + '_ {
        (0..self.len()).filter_map(|step| self.get(step))
    }

    /// Repeat the last record until the series holds `len` entries.
    pub fn extend_last(&mut self, len: usize) {
        if let Some(last) = self.last() {
            while self.len() < len {
                self.push(last);
            }
        }
    }

    pub(crate) fn is_consistent(&self) -> bool {
        self.idea_mean.len() == self.len() && self.idea_std.len() == self.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Agent, PERSONALITY_SIZE};

    #[test]
    fn gather_skips_virtual_agents() {
        let agents = vec![
            Agent::new(0, EpiState::S, [0.5; PERSONALITY_SIZE], [0.2, 0.4, 0.6]),
            Agent::new(1, EpiState::Is, [0.5; PERSONALITY_SIZE], [0.4, 0.4, 0.0]),
            Agent::new_virtual(2, [0.5; PERSONALITY_SIZE], [1.0, 1.0, 1.0]),
        ];
        let graph = Graph::new(agents, Vec::new(), Vec::new()).unwrap();

        let record = Record::gather(&graph);
        assert_eq!(record.population(), 2);
        assert_eq!(record.count(EpiState::S), 1);
        assert_eq!(record.infectious(), 1);
        assert!((record.idea_mean[0] - 0.3).abs() < 1e-12);
        assert!((record.idea_std[0] - 0.1).abs() < 1e-12);
        assert!(record.idea_std[1].abs() < 1e-12);
    }

    #[test]
    fn extend_last_leaves_empty_history_alone() {
        let mut history = History::default();
        history.extend_last(4);
        assert!(history.is_empty());
        assert_eq!(history.last(), None);
    }

    #[test]
    fn extend_last_pads_with_copies() {
        let mut history = History::default();
        let record = Record {
            state_counts: [3, 0, 0, 0, 1, 0, 0],
            idea_mean: [0.5; IDEAS_SIZE],
            idea_std: [0.1; IDEAS_SIZE],
        };
        history.push(record);
        history.extend_last(4);
        assert_eq!(history.len(), 4);
        assert!(history.records().all(|rec| rec == record));
    }
}
