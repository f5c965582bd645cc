use std::{
    error::Error,
    fs,
    io::{self, BufRead},
    path::PathBuf,
};

use clap::Parser;
use embassy_time::block_for;
use smc_core::utils::controllers::{ModuleCommand, ModuleConfig, ModuleController, SimAxis};
use tracing::{error, info};

#[derive(Parser)]
#[clap(version = "1.0")]
struct Opts {
    /// JSON module configuration; missing fields use defaults
    #[clap(long)]
    config: Option<PathBuf>,
    /// JSON-lines command script (reads stdin when omitted)
    #[clap(long)]
    script: Option<PathBuf>,
    /// control intervals to run after each command
    #[clap(long, default_value_t = 25)]
    ticks: u32,
    /// initial turning-encoder position (ticks)
    #[clap(long, default_value_t = 0, allow_negative_numbers = true)]
    start_ticks: i32,
    /// wait one control interval per tick
    #[clap(long)]
    realtime: bool,
}

fn load_config(path: Option<&PathBuf>) -> Result<ModuleConfig, Box<dyn Error>> {
    match path {
        Some(path) => {
            let text = fs::read_to_string(path)?;
            Ok(serde_json::from_str(&text)?)
        }
        None => Ok(ModuleConfig::default()),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let opts: Opts = Opts::parse();
    let config = load_config(opts.config.as_ref())?;
    let period = config.period();

    let mut module = ModuleController::new(
        SimAxis::new(),
        SimAxis::with_position(opts.start_ticks),
        config,
    )?;

    let lines: Box<dyn BufRead> = match &opts.script {
        Some(path) => Box::new(io::BufReader::new(fs::File::open(path)?)),
        None => Box::new(io::stdin().lock()),
    };

    for line in lines.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let command = match serde_json::from_str::<ModuleCommand>(line) {
            Ok(command) => command,
            Err(error) => {
                error!(?error, line, "error deserializing ModuleCommand");
                continue;
            }
        };

        let result = module.execute_command(command)?;
        info!(?command, speed = result.speed, angle = result.angle, "command executed");

        for tick in 0..opts.ticks {
            module.periodic()?;
            if opts.realtime {
                block_for(period);
            }
            let state = module.state()?;
            let position = module.position()?;
            info!(
                tick,
                speed = state.speed,
                angle = state.angle,
                distance = position.distance,
                drive_volts = module.drive_voltage(),
                turning_volts = module.turning_voltage(),
                "module state"
            );
        }
    }

    let state = module.state()?;
    info!(speed = state.speed, angle = state.angle, "final module state");
    Ok(())
}

#[cfg(test)]
mod tests {
    use embassy_time::Instant;

    use super::*;

    #[test]
    fn realtime_wait_covers_one_control_interval() {
        let period = ModuleConfig::default().period();
        let start = Instant::now();
        block_for(period);
        assert!(start.elapsed() >= period);
    }
}
