use crate::match_snapshot::Period;
use core::time::Duration;
use log::*;
use serde::{Deserialize, Serialize};
use std::fs::read_to_string;
use std::path::Path;

/// Timing rules for a single match. All values are in seconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub half_play_duration: u16,
    pub extra_half_play_duration: u16,
    pub extra_time_allowed: bool,
    pub temp_expulsion_duration: u16,
    pub substitution_forfeit: u16,
}

impl Default for Game {
    fn default() -> Self {
        Self {
            half_play_duration: 2700,
            extra_half_play_duration: 900,
            extra_time_allowed: true,
            temp_expulsion_duration: 600,
            substitution_forfeit: 30,
        }
    }
}

impl Game {
    pub fn regulation_duration(&self, period: Period) -> Duration {
        match period {
            Period::FirstHalf | Period::SecondHalf => {
                Duration::from_secs(self.half_play_duration.into())
            }
            Period::ExtraFirst | Period::ExtraSecond => {
                Duration::from_secs(self.extra_half_play_duration.into())
            }
        }
    }

    pub fn temp_expulsion_duration(&self) -> Duration {
        Duration::from_secs(self.temp_expulsion_duration.into())
    }

    pub fn substitution_forfeit(&self) -> Duration {
        Duration::from_secs(self.substitution_forfeit.into())
    }

    /// Whether play may move on from `period` into the period after it
    pub fn allows_period_after(&self, period: Period) -> bool {
        match period.next_period() {
            Some(Period::ExtraFirst) => self.extra_time_allowed,
            Some(_) => true,
            None => false,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub game: Game,
}

impl Config {
    pub fn new_from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let config_file = match read_to_string(path) {
            Ok(f) => f,
            Err(e) => {
                error!("Failed to read config file: {}", e);
                return Err(Box::new(e));
            }
        };

        match toml::from_str(&config_file) {
            Ok(c) => Ok(c),
            Err(e) => {
                error!("Failed to parse config file: {}", e);
                Err(Box::new(e))
            }
        }
    }
}
