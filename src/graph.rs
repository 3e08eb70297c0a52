//! Population store with its epidemiological and social edge sets.

use crate::error::GraphError;
use crate::model::{Agent, Edge};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

type Adjacency = Vec<Vec<usize>>;

/// Agents are stored densely by id and never removed; dead agents only lose their edges.
///
/// Each edge set has a lazily built adjacency index. Any mutation of an edge set
/// resets its index, so lookups never see stale neighbours.
#[derive(Debug, Clone, Serialize)]
pub struct Graph {
    agents: Vec<Agent>,
    epi_edges: Vec<Edge>,
    social_edges: Vec<Edge>,
    #[serde(skip)]
    epi_adjacency: OnceLock<Adjacency>,
    #[serde(skip)]
    social_adjacency: OnceLock<Adjacency>,
}

#[derive(Deserialize)]
struct GraphData {
    agents: Vec<Agent>,
    epi_edges: Vec<Edge>,
    social_edges: Vec<Edge>,
}

impl<'de> Deserialize<'de> for Graph {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let data = GraphData::deserialize(deserializer)?;
        Graph::new(data.agents, data.epi_edges, data.social_edges)
            .map_err(serde::de::Error::custom)
    }
}

impl Graph {
    /// Assemble a graph, checking ids and edge identities.
    ///
    /// Repeated edges with the same weight collapse into one; repeated edges
    /// with different weights are rejected.
    pub fn new(
        agents: Vec<Agent>,
        epi_edges: Vec<Edge>,
        social_edges: Vec<Edge>,
    ) -> Result<Self, GraphError> {
        for (index, agent) in agents.iter().enumerate() {
            if agent.id() != index {
                return Err(GraphError::AgentIdMismatch {
                    index,
                    id: agent.id(),
                });
            }
        }

        let n_agents = agents.len();
        let epi_edges = dedup_edges(epi_edges, n_agents)?;
        let social_edges = dedup_edges(social_edges, n_agents)?;

        Ok(Self {
            agents,
            epi_edges,
            social_edges,
            epi_adjacency: OnceLock::new(),
            social_adjacency: OnceLock::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Mutable view of the agents. The slice cannot change the population size.
    pub fn agents_mut(&mut self) -> &mut [Agent] {
        &mut self.agents
    }

    pub fn agent(&self, id: usize) -> Option<&Agent> {
        self.agents.get(id)
    }

    pub fn epi_edges(&self) -> &[Edge] {
        &self.epi_edges
    }

    pub fn social_edges(&self) -> &[Edge] {
        &self.social_edges
    }

    /// Outgoing epidemiological contacts of `id`, in edge order.
    ///
    /// Unknown or isolated ids yield an empty slice.
    pub fn neighbors_epi(&self, id: usize) -> &[usize] {
        let adjacency = self
            .epi_adjacency
            .get_or_init(|| build_adjacency(&self.epi_edges, self.agents.len()));
        adjacency.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Outgoing social contacts of `id`, in edge order.
    pub fn neighbors_social(&self, id: usize) -> &[usize] {
        let adjacency = self
            .social_adjacency
            .get_or_init(|| build_adjacency(&self.social_edges, self.agents.len()));
        adjacency.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Remove every edge incident to `id` in both edge sets.
    pub fn remove_agent_edges(&mut self, id: usize) {
        self.remove_agents_edges(&[id]);
    }

    /// Remove every edge incident to any of `ids` in both edge sets.
    ///
    /// Both adjacency indices are invalidated once, whatever the number of ids.
    pub fn remove_agents_edges(&mut self, ids: &[usize]) {
        if ids.is_empty() {
            return;
        }
        let ids: HashSet<usize> = ids.iter().copied().collect();
        let detached = |edge: &Edge| !ids.contains(&edge.source_id) && !ids.contains(&edge.target_id);

        self.epi_edges.retain(detached);
        self.social_edges.retain(detached);

        self.epi_adjacency = OnceLock::new();
        self.social_adjacency = OnceLock::new();
    }

    pub fn select(&self, ids: &[usize]) -> Vec<&Agent> {
        ids.iter().filter_map(|&id| self.agents.get(id)).collect()
    }
}

fn dedup_edges(edges: Vec<Edge>, n_agents: usize) -> Result<Vec<Edge>, GraphError> {
    let mut weights = HashMap::with_capacity(edges.len());
    let mut unique = Vec::with_capacity(edges.len());

    for edge in edges {
        if edge.source_id >= n_agents || edge.target_id >= n_agents {
            return Err(GraphError::UnknownAgent {
                source_id: edge.source_id,
                target_id: edge.target_id,
                n_agents,
            });
        }
        match weights.get(&(edge.source_id, edge.target_id)) {
            Some(&weight) if weight == edge.weight => {}
            Some(_) => {
                return Err(GraphError::DuplicateEdge {
                    source_id: edge.source_id,
                    target_id: edge.target_id,
                });
            }
            None => {
                weights.insert((edge.source_id, edge.target_id), edge.weight);
                unique.push(edge);
            }
        }
    }

    Ok(unique)
}

fn build_adjacency(edges: &[Edge], n_agents: usize) -> Adjacency {
    let mut adjacency = vec![Vec::new(); n_agents];
    for edge in edges {
        adjacency[edge.source_id].push(edge.target_id);
    }
    adjacency
}
