pub mod clock_driver;
pub mod config;
pub mod console;
pub mod match_manager;
pub mod playing_time;
