//! Extended SEIR state machine with mask, distancing and vaccine modifiers.

use crate::config::ModelParams;
use crate::graph::Graph;
use crate::model::{Agent, EpiState, EpiStatus};
use rand::prelude::*;

/// Compute the next epidemiological status of `agent`.
///
/// Pure with respect to the graph: only the returned status differs from the input.
pub fn transition<R: Rng>(
    agent: &Agent,
    graph: &Graph,
    params: &ModelParams,
    rng: &mut R,
) -> EpiStatus {
    let mut epi = *agent.epi();
    epi.tic();

    match epi.state {
        EpiState::S => expose(agent, &mut epi, graph, params, rng),
        EpiState::E if epi.timer >= params.phi => {
            if rng.random::<f64>() < params.eta {
                epi.set_state(EpiState::Is);
            } else {
                epi.set_state(EpiState::Ia);
            }
        }
        EpiState::Ia if epi.timer >= params.gamma_a => epi.set_state(EpiState::Rf),
        EpiState::Is if epi.timer >= params.gamma_s => {
            let chance = rng.random::<f64>();
            if params.psi_2 < chance && chance <= params.psi_3 {
                epi.set_state(EpiState::D);
            } else if params.psi_1 < chance && chance <= params.psi_2 {
                epi.set_state(EpiState::Rp);
            } else {
                epi.set_state(EpiState::Rf);
            }
        }
        EpiState::Rf if epi.timer >= params.chi_f => epi.set_state(EpiState::S),
        EpiState::Rp if epi.timer >= params.chi_p => epi.set_state(EpiState::S),
        _ => {}
    }

    epi
}

fn expose<R: Rng>(
    agent: &Agent,
    epi: &mut EpiStatus,
    graph: &Graph,
    params: &ModelParams,
    rng: &mut R,
) {
    // Isolated agents skip the infection check but may still take a booster.
    let contact = graph
        .neighbors_epi(agent.id())
        .choose(rng)
        .and_then(|&id| graph.agent(id));

    if let Some(contact) = contact {
        let chance = rng.random::<f64>()
            * mask_multiplier(agent, contact, params)
            * distancing_multiplier(agent, contact, params)
            * vaccine_multiplier(epi);

        if contact.state().is_infectious() && chance <= params.beta {
            epi.set_state(EpiState::E);
            return;
        }
    }

    let due = epi.vaccine_count == 0 || epi.since_vaccination() >= params.vaccinate_delta_time;
    if agent.vaccinated() && due {
        epi.vaccine_count += 1;
        epi.last_vaccination_time = epi.clock;
    }
}

fn mask_multiplier(agent: &Agent, contact: &Agent, params: &ModelParams) -> f64 {
    match (agent.wearing_mask(), contact.wearing_mask()) {
        (true, true) => params.mask_si_reduce_factor,
        (true, false) => params.mask_s_reduce_factor,
        (false, true) => params.mask_i_reduce_factor,
        (false, false) => 1.0,
    }
}

fn distancing_multiplier(agent: &Agent, contact: &Agent, params: &ModelParams) -> f64 {
    if agent.social_distancing() || contact.social_distancing() {
        params.social_distance_reduce_factor
    } else {
        1.0
    }
}

/// Infection risk factor left by vaccination.
///
/// Starts at a floor that drops with every dose and wanes linearly back to 1.
pub fn vaccine_multiplier(epi: &EpiStatus) -> f64 {
    let elapsed = epi.since_vaccination() as f64;
    let (floor, waning) = match epi.vaccine_count {
        0 => return 1.0,
        1 => (0.8, 60.0),
        2 => (0.1, 90.0),
        3 => (0.05, 90.0),
        _ => (0.0, 90.0),
    };
    f64::min(floor + elapsed / waning, 1.0)
}
