//! Population and topology generators.

use crate::config::{InitParams, Topology};
use crate::graph::Graph;
use crate::model::{Agent, Edge, EpiState, Ideas, Personality};
use anyhow::{Context, Result, bail};
use rand::prelude::*;
use rand::seq::index;
use rand_distr::Bernoulli;
use std::collections::HashSet;

/// Build the graph described by `init`, real agents first and virtual agents last.
pub fn generate_population<R: Rng>(init: &InitParams, rng: &mut R) -> Result<Graph> {
    let n_agents = init.topology.n_agents();
    let infected_dist =
        Bernoulli::new(init.initial_infected).context("invalid initial infected portion")?;
    let mut agents: Vec<_> = (0..n_agents)
        .map(|id| random_agent(id, &infected_dist, rng))
        .collect();

    let (epi_edges, mut social_edges) = match init.topology {
        Topology::Random {
            n_epi_edges,
            n_social_edges,
            ..
        } => (
            random_edges(n_agents, n_epi_edges, rng).context("failed to draw epidemiological edges")?,
            random_edges(n_agents, n_social_edges, rng).context("failed to draw social edges")?,
        ),
        Topology::FullyConnected { .. } => (complete_edges(n_agents), complete_edges(n_agents)),
    };

    if init.virtual_reach > n_agents {
        bail!("virtual agents cannot influence more than {n_agents} agents");
    }
    // Followers point at the source so it shows up among their social neighbours.
    for i_virtual in 0..init.n_virtual {
        let id = n_agents + i_virtual;
        agents.push(Agent::new_virtual(id, random_vec(rng), init.virtual_ideas));
        social_edges.extend(
            index::sample(rng, n_agents, init.virtual_reach)
                .into_iter()
                .map(|follower_id| Edge::new(follower_id, id, 1)),
        );
    }

    let graph = Graph::new(agents, epi_edges, social_edges).context("failed to assemble graph")?;
    log::info!(
        "generated {} agents, {} epidemiological edges, {} social edges",
        graph.len(),
        graph.epi_edges().len(),
        graph.social_edges().len()
    );
    Ok(graph)
}

fn random_agent<R: Rng>(id: usize, infected_dist: &Bernoulli, rng: &mut R) -> Agent {
    let state = if infected_dist.sample(rng) {
        EpiState::Ia
    } else {
        EpiState::S
    };
    let personality: Personality = random_vec(rng);
    let ideas: Ideas = random_vec(rng);
    Agent::new(id, state, personality, ideas)
}

fn random_vec<R: Rng, const N: usize>(rng: &mut R) -> [f64; N] {
    std::array::from_fn(|_| rng.random())
}

fn random_edges<R: Rng>(n_agents: usize, n_edges: usize, rng: &mut R) -> Result<Vec<Edge>> {
    let max_edges = n_agents * n_agents.saturating_sub(1);
    if n_edges > max_edges {
        bail!("cannot place {n_edges} distinct edges among {n_agents} agents");
    }

    let mut seen = HashSet::with_capacity(n_edges);
    let mut edges = Vec::with_capacity(n_edges);
    while edges.len() < n_edges {
        let source_id = rng.random_range(0..n_agents);
        let target_id = rng.random_range(0..n_agents);
        if source_id != target_id && seen.insert((source_id, target_id)) {
            edges.push(Edge::new(source_id, target_id, 1));
        }
    }
    Ok(edges)
}

fn complete_edges(n_agents: usize) -> Vec<Edge> {
    (0..n_agents)
        .flat_map(|source_id| {
            (0..n_agents)
                .filter(move |&target_id| target_id != source_id)
                .map(move |target_id| Edge::new(source_id, target_id, 1))
        })
        .collect()
}
