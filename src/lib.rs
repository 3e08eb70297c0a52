//! Coupled epidemic and idea-diffusion simulation over contact and social graphs.
//!
//! The [`engine::Simulator`] advances a [`graph::Graph`] step by step; the
//! [`manager::Manager`] drives runs from a simulation directory.

pub mod analysis;
pub mod config;
pub mod engine;
pub mod epidemic;
pub mod error;
pub mod generate;
pub mod graph;
pub mod history;
pub mod manager;
pub mod model;
pub mod policy;
pub mod social;
pub mod stats;
