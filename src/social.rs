//! Rumour-style idea diffusion over the social graph.

use crate::config::ModelParams;
use crate::graph::Graph;
use crate::model::{Agent, IDEAS_SIZE, Ideas};

/// Cosine similarity of two vectors, or 1 when either vector is zero.
pub fn cosine_similarity(u: &[f64], v: &[f64]) -> f64 {
    let mut uv = 0.0;
    let mut uu = 0.0;
    let mut vv = 0.0;
    for (a, b) in u.iter().zip(v) {
        uv += a * b;
        uu += a * a;
        vv += b * b;
    }
    if uu == 0.0 || vv == 0.0 {
        return 1.0;
    }
    uv / (uu * vv).sqrt()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reaction {
    Attract,
    Repel,
    Ignore,
}

fn react(ideas_dissimilarity: f64, personality_dissimilarity: f64, params: &ModelParams) -> Reaction {
    let similar_ideas = ideas_dissimilarity < params.ideas_reject;
    let similar_personality = personality_dissimilarity < params.personality_reject;
    match (similar_ideas, similar_personality) {
        (true, true) => Reaction::Attract,
        (true, false) | (false, true) => Reaction::Repel,
        (false, false) => Reaction::Ignore,
    }
}

/// Compute the idea vector `agent` holds after one diffusion step.
///
/// Reads only the current ideas of the agent and its social neighbours.
/// Returns the old vector when the agent has no neighbours or none of them matters.
pub fn diffuse(agent: &Agent, graph: &Graph, params: &ModelParams) -> Ideas {
    let ideas = *agent.ideas();
    let mut score = [0.0; IDEAS_SIZE];
    let mut total_influence = 0.0;

    for other in graph.select(graph.neighbors_social(agent.id())) {
        let ideas_dissimilarity = 1.0 - cosine_similarity(&ideas, other.ideas());
        let personality_similarity = cosine_similarity(agent.personality(), other.personality());

        let sign = match react(ideas_dissimilarity, 1.0 - personality_similarity, params) {
            Reaction::Attract => 1.0,
            Reaction::Repel => -1.0,
            Reaction::Ignore => continue,
        };
        for (acc, idea) in score.iter_mut().zip(other.ideas()) {
            *acc += sign * personality_similarity * idea;
        }
        total_influence += personality_similarity;
    }

    if total_influence == 0.0 {
        return ideas;
    }

    let mut new_ideas = ideas;
    for (idea, acc) in new_ideas.iter_mut().zip(score) {
        *idea = (*idea + params.lambda * acc / total_influence).clamp(0.0, 1.0);
    }
    new_ideas
}
