use std::sync::Arc;

use serde::Serialize;
use trade_core::{
    Economy, PauseOutcome, Registry, SimConfig, Simulation, StartOutcome, Station, SystemClock,
    setup_example_world,
};

use crate::command::{Command, HELP, ListTarget};

/// What the shell should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Print(String),
    Exit,
}

pub struct Shell {
    simulation: Simulation,
    config: SimConfig,
}

impl Shell {
    pub fn new(config: SimConfig) -> Self {
        let registry = Arc::new(Registry::new());
        let economy = Economy::new(registry, Arc::new(SystemClock), &config);
        Self {
            simulation: Simulation::new(economy, &config),
            config,
        }
    }

    fn registry(&self) -> &Registry {
        self.simulation.registry()
    }

    pub fn execute(&self, command: Command) -> anyhow::Result<Reply> {
        let text = match command {
            Command::Exit => {
                self.simulation.pause();
                return Ok(Reply::Exit);
            }
            Command::Help => HELP.to_string(),
            Command::Init => {
                let world = setup_example_world(self.registry(), &self.config);
                format!("Initialized example world at station {}", world.station)
            }
            Command::Start => match self.simulation.start() {
                StartOutcome::Started => "Simulation started".to_string(),
                StartOutcome::AlreadyRunning => "Program already running".to_string(),
            },
            Command::Pause => match self.simulation.pause() {
                PauseOutcome::Paused => "Simulation paused".to_string(),
                PauseOutcome::NotRunning => "World not active".to_string(),
            },
            Command::List(target) => self.list(target)?,
            Command::AddStation { name } => {
                let station = Station::new(name);
                let text = format!("Added station {} ({})", station.name, station.id);
                self.registry().insert(station);
                text
            }
        };
        Ok(Reply::Print(text))
    }

    fn list(&self, target: ListTarget) -> serde_json::Result<String> {
        let registry = self.registry();
        match target {
            ListTarget::Commodities => pretty(&registry.commodities(&[])),
            ListTarget::Entities => pretty(&registry.entities(&[])),
            ListTarget::Businesses => pretty(&registry.businesses(&[])),
            ListTarget::Producers => pretty(&registry.production_units(&[])),
            ListTarget::Stations => pretty(&registry.stations(&[])),
            ListTarget::Stockpile => pretty(&registry.stocks(&[])),
            ListTarget::ActiveTrades => pretty(&registry.active_trades(&[])),
        }
    }
}

fn pretty<T: Serialize>(records: &[T]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(records)
}
