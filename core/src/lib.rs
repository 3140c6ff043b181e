pub mod bankruptcy_subsystem;
pub mod config;
pub mod consideration;
pub mod context;
pub mod decision;
pub mod economics_subsystem;
pub mod engine;
pub mod error;
pub mod evaluation;
pub mod event;
pub mod experiment;
pub mod grid;
pub mod household;
pub mod market;
pub mod metrics;
pub mod monte_carlo;
pub mod price_experiment_subsystem;
pub mod product_experiment_subsystem;
pub mod reassessment_subsystem;
pub mod rng;
pub mod snapshot;
pub mod store;
pub mod subsystem;
pub mod types;
