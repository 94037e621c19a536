mod aggregation;
mod builder;
mod client;
pub mod config;
mod error;
mod records;
mod server;
mod simulation;

pub use aggregation::Aggregation;
pub use builder::{ModelFactory, ModelRegistry, ModelShape, SimulationBuilder};
pub use client::{Client, ClientState, FederatedClient};
pub use config::CezoConfig;
pub use error::{FederationErr, Result};
pub use records::SeedGradRecords;
pub use server::{CezoServer, RoundReport, SyncPolicy};
pub use simulation::{Evaluation, Simulation};
