use serde::{Deserialize, Serialize};
use std::time::Duration;
pub use matchclock_common::config::Game;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Driver {
    /// How often the derived counters are refreshed while a period is live
    pub tick_interval_ms: u16,
    /// Print a JSON snapshot to stdout on every tick
    pub print_snapshots: bool,
}

impl Default for Driver {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            print_snapshots: false,
        }
    }
}

impl Driver {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1).into())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub game: Game,
    pub driver: Driver,
}
