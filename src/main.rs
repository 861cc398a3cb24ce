use std::fs::{self, File};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{error, info};
use simplelog::{Config, LevelFilter, WriteLogger};

use lazyview::Options;
use lazyview::scenario::{self, Scenario};

#[derive(Parser, Debug)]
#[command(name = "lazyview", version, about = "Replay lazy image loading over a scripted page")]
struct Cli {
    /// Where to write the debug log
    #[arg(long, global = true, default_value = "lazyview.log")]
    log_file: PathBuf,

    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Debug)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a scenario file and print what was loaded when
    Replay {
        scenario: PathBuf,

        /// Options file (YAML or JSON) overriding the scenario's options
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Parse an options file and print it with defaults filled in
    CheckConfig { path: PathBuf },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    WriteLogger::init(
        cli.log_level.into(),
        Config::default(),
        File::create(&cli.log_file)
            .with_context(|| format!("Failed to create log file: {:?}", cli.log_file))?,
    )?;

    info!("Starting lazyview");
    let result = run(cli.command);
    if let Err(err) = &result {
        error!("lazyview failed: {err:?}");
    }
    info!("Shutting down lazyview");
    result
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Replay {
            scenario: path,
            config,
            format,
        } => {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read scenario: {path:?}"))?;
            let scenario = Scenario::from_yaml_str(&content)
                .with_context(|| format!("Failed to parse scenario: {path:?}"))?;
            let options = config
                .map(|config| {
                    Options::load(&config)
                        .with_context(|| format!("Failed to load options: {config:?}"))
                })
                .transpose()?;

            let report = scenario::replay(&scenario, options)
                .with_context(|| format!("Failed to replay scenario: {path:?}"))?;

            match format {
                Format::Text => print!("{report}"),
                Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            }
        }
        Command::CheckConfig { path } => {
            let options = Options::load(&path)
                .with_context(|| format!("Failed to load options: {path:?}"))?;
            print!("{}", serde_yaml::to_string(&options)?);
        }
    }
    Ok(())
}
