use std::env;

use anyhow::{Context, Result, bail};
use federation::{CezoConfig, Simulation};
use log::info;

const CONFIG_VAR: &str = "CEZO_CONFIG";

fn main() -> Result<()> {
    env_logger::init();

    let path = match env::args().nth(1).or_else(|| env::var(CONFIG_VAR).ok()) {
        Some(path) => path,
        None => bail!("usage: node <config.json> (or set {CONFIG_VAR})"),
    };

    let config =
        CezoConfig::from_path(&path).with_context(|| format!("loading config from {path}"))?;
    info!("loaded config from {path}");

    let mut simulation = Simulation::from_config(&config).context("building simulation")?;
    let evaluations = simulation.run().context("running simulation")?;

    if let Some(last) = evaluations.last() {
        info!(
            iteration = last.iteration,
            loss = last.loss,
            accuracy = last.accuracy;
            "final evaluation"
        );
        println!(
            "iteration {}: loss {:.4}, accuracy {:.2}%",
            last.iteration,
            last.loss,
            last.accuracy * 100.
        );
    }

    Ok(())
}
