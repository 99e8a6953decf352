use clap::Parser;
use log::*;
#[cfg(debug_assertions)]
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::{
    append::rolling_file::{
        RollingFileAppender,
        policy::compound::{
            CompoundPolicy, roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger,
        },
    },
    config::{Appender, Config as LogConfig, Logger, Root},
    encode::pattern::PatternEncoder,
};
use matchclock::{
    clock_driver::{ClockDriver, lock},
    config::Config,
    console::{Command, HELP},
    match_manager::{MatchManager, match_record::MatchRecord},
};
use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    time::Instant,
};

const APP_NAME: &str = "matchclock";

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[clap(long, short, action(clap::ArgAction::Count))]
    /// Increase the log verbosity
    verbose: u8,

    #[clap(long, short)]
    /// TOML file with a `[game]` section to use instead of the stored config
    config: Option<PathBuf>,

    #[clap(long)]
    /// Milliseconds between clock ticks, overrides the config
    tick_ms: Option<u16>,

    #[clap(long)]
    /// Resume the match saved in this file
    restore: Option<PathBuf>,

    #[clap(long)]
    /// Print a JSON snapshot on every tick
    print_snapshots: bool,

    #[clap(long)]
    /// Directory within which log files will be placed, default is platform dependent
    log_location: Option<PathBuf>,

    #[clap(long, default_value = "5000000")]
    /// Max size in bytes that a log file is allowed to reach before being rolled over
    log_max_file_size: u64,

    #[clap(long, default_value = "3")]
    /// Number of archived logs to keep
    num_old_logs: u32,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();

    let log_level = match args.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let log_base_path = args.log_location.clone().unwrap_or_else(|| {
        let mut path = directories::BaseDirs::new()
            .expect("Could not find a directory to store logs")
            .data_local_dir()
            .to_path_buf();
        path.push("matchclock-logs");
        path
    });
    let mut log_path = log_base_path.clone();
    let mut archived_log_path = log_base_path;
    log_path.push(format!("{APP_NAME}-log.txt"));
    archived_log_path.push(format!("{APP_NAME}-log-{{}}.txt.gz"));

    #[cfg(debug_assertions)]
    println!("Log path: {}", log_path.display());

    // Only log to the console in debug mode
    #[cfg(debug_assertions)]
    let console = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("[{d} {h({l:5})} {M}] {m}{n}")))
        .build();

    // Setup the file log roller
    let roller = FixedWindowRoller::builder()
        .build(
            archived_log_path.as_os_str().to_str().unwrap(),
            args.num_old_logs,
        )
        .unwrap();
    let file_policy = CompoundPolicy::new(
        Box::new(SizeTrigger::new(args.log_max_file_size)),
        Box::new(roller),
    );
    let file_appender = RollingFileAppender::builder()
        .append(true)
        .encoder(Box::new(PatternEncoder::new("[{d} {l:5} {M}] {m}{n}")))
        .build(log_path, Box::new(file_policy))
        .unwrap();

    // Setup the logging from all locations to use `LevelFilter::Error`
    let root = Root::builder().appender("file_appender");
    #[cfg(debug_assertions)]
    let root = root.appender("console");
    let root = root.build(LevelFilter::Error);

    // Setup the top level logging config
    let log_config = LogConfig::builder()
        .appender(Appender::builder().build("file_appender", Box::new(file_appender)));

    #[cfg(debug_assertions)]
    let log_config = log_config.appender(Appender::builder().build("console", Box::new(console)));

    let log_config = log_config
        .logger(Logger::builder().build(APP_NAME, log_level)) // Setup the logging from the matchclock crate to use `log_level`
        .build(root)
        .unwrap();

    log4rs::init_config(log_config).unwrap();
    log_panics::init();

    info!("Starting Match Clock");

    let mut config = load_config()?;
    if let Some(path) = &args.config {
        info!("Reading game config from {path:?}");
        config.game = matchclock_common::config::Config::new_from_file(path)?.game;
    }
    if let Some(tick_ms) = args.tick_ms {
        config.driver.tick_interval_ms = tick_ms;
    }
    let print_snapshots = args.print_snapshots || config.driver.print_snapshots;

    let tm = match &args.restore {
        Some(path) => {
            info!("Restoring match from {path:?}");
            let record = MatchRecord::from_json(&tokio::fs::read_to_string(path).await?)?;
            MatchManager::restore(config.game.clone(), record, Instant::now())
        }
        None => MatchManager::new(config.game.clone()),
    };
    let tm = Arc::new(Mutex::new(tm));

    let (driver, mut snapshot_rx) = ClockDriver::new(tm.clone(), config.driver.tick_interval());
    tokio::spawn(driver.run());

    if print_snapshots {
        tokio::spawn(async move {
            while snapshot_rx.changed().await.is_ok() {
                let json = snapshot_rx
                    .borrow_and_update()
                    .as_ref()
                    .map(serde_json::to_string);
                match json {
                    Some(Ok(json)) => println!("{json}"),
                    Some(Err(e)) => error!("Failed to serialize snapshot: {e}"),
                    None => {}
                }
            }
        });
    }

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }

        let output = command.apply(&mut lock(&tm), Instant::now());
        match (output, &command) {
            (Ok(Some(json)), Command::Save(Some(path))) => {
                tokio::fs::write(path, json).await?;
                info!("Saved match to {path:?}");
            }
            (Ok(Some(text)), _) => println!("{text}"),
            (Ok(None), _) => {}
            (Err(e), _) => println!("{e}"),
        }
    }

    info!("Shutting down");
    Ok(())
}

fn load_config() -> Result<Config, confy::ConfyError> {
    info!(
        "Reading config file from {:?}",
        confy::get_configuration_file_path(APP_NAME, None)?
    );

    let config: Config = match confy::load(APP_NAME, None) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file, overwriting with default. Error: {e}");
            let config = Config::default();
            confy::store(APP_NAME, None, &config)?;
            config
        }
    };
    debug!("Loaded config: {config:#?}");
    Ok(config)
}
