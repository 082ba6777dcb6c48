//! Binary entrypoint for the Chatquest CLI.
//!
//! Commands:
//! - `init` - write a starter `config.toml` and create the data directory
//! - `play` - read `<player> <command> [args...]` lines from stdin, print one JSON result per line
//! - `top [-n <count>]` - print the leaderboard from the save file
//!
//! See the library crate docs for module-level details: `chatquest::`.
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{error, info};
use tokio::io::{AsyncBufReadExt, BufReader};

use chatquest::config::Config;
use chatquest::console::{self, ConsoleLine};
use chatquest::game::{GameEngine, Intent, Outcome, Request};

#[derive(Parser)]
#[command(name = "chatquest")]
#[command(about = "Character state and combat engine for chat role-playing games")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,
    /// Run the console game loop on stdin/stdout
    Play,
    /// Print the leaderboard
    Top {
        /// Number of entries (defaults to the configured leaderboard size)
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            init_logging(&None, cli.verbose);
            info!("Initializing new Chatquest configuration");
            Config::create_default(&cli.config).await?;
            let cfg = Config::default();
            tokio::fs::create_dir_all(&cfg.storage.data_dir).await?;
            info!("Configuration file created at {}", cli.config);
            println!("Configuration written to {}", cli.config);
        }
        Commands::Play => {
            let config = load_config(&cli.config).await?;
            init_logging(&Some(config.clone()), cli.verbose);
            info!("Starting Chatquest v{}", env!("CARGO_PKG_VERSION"));
            let mut engine = GameEngine::from_config(&config)?;
            run_console(&mut engine).await?;
        }
        Commands::Top { count } => {
            let mut config = load_config(&cli.config).await?;
            init_logging(&Some(config.clone()), cli.verbose);
            if let Some(n) = count {
                config.game.leaderboard_size = n;
            }
            let mut engine = GameEngine::from_config(&config)?;
            let req = Request::new("console", Intent::Top, Vec::<String>::new(), chrono::Utc::now());
            if let Outcome::Leaderboard { entries } = engine.handle(&req)? {
                for e in entries {
                    println!("{:>2}. {} - level {}, {} XP", e.rank, e.id, e.level, e.xp);
                }
            }
        }
    }

    Ok(())
}

/// Missing config file means defaults; a broken one is an error.
async fn load_config(path: &str) -> Result<Config> {
    if tokio::fs::metadata(path).await.is_ok() {
        Config::load(path).await
    } else {
        Ok(Config::default())
    }
}

async fn run_console(engine: &mut GameEngine) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut handled = 0u64;
    while let Some(line) = lines.next_line().await? {
        match console::parse_line(&line, chrono::Utc::now()) {
            ConsoleLine::Blank => continue,
            ConsoleLine::Invalid(msg) => println!("{}", console::render_invalid(&msg)),
            ConsoleLine::Request(req) => {
                let result = engine.handle(&req);
                println!("{}", console::render(&result));
                handled += 1;
            }
        }
    }
    info!("Input closed after {} requests; saving", handled);
    if let Err(e) = engine.save() {
        error!("Final save failed: {}", e);
        return Err(e.into());
    }
    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity wins over the configured level
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|c| c.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);
    let log_file = config.as_ref().and_then(|c| c.logging.file.clone());
    let opened = log_file.and_then(|file| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(file)
            .ok()
    });
    if let Some(f) = opened {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Echo to the console only when attached to a terminal
        let is_tty = atty::is(atty::Stream::Stdout);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            writeln!(
                fmt,
                "{} [{}] {}",
                chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                record.level(),
                record.args()
            )
        });
    }
    let _ = builder.try_init();
}
