use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::time::{Duration, UNIX_EPOCH};

use bowcheckpoint::checkpoint::{FilePropertySetter, LinuxRebootHook};
use bowcheckpoint::mount::load_fstab;
use bowcheckpoint::{CheckpointManager, Config, RestoreEngine};

const BUILD_TIMESTAMP: u64 = const_parse_u64(env!("BUILD_TIMESTAMP"));
const GIT_HASH: &str = env!("GIT_HASH");

const fn const_parse_u64(s: &str) -> u64 {
    let bytes = s.as_bytes();
    let mut result: u64 = 0;
    let mut i = 0;
    while i < bytes.len() {
        result = result * 10 + (bytes[i] - b'0') as u64;
        i += 1;
    }
    result
}

fn format_build_time() -> String {
    let dt = UNIX_EPOCH + Duration::from_secs(BUILD_TIMESTAMP);
    let secs = dt.duration_since(UNIX_EPOCH).unwrap().as_secs();
    // Simple UTC formatting: YYYY-MM-DD HH:MM:SS
    let days_since_epoch = secs / 86400;
    let time_of_day = secs % 86400;
    let hours = time_of_day / 3600;
    let minutes = (time_of_day % 3600) / 60;
    let seconds = time_of_day % 60;

    let (year, month, day) = days_to_ymd(days_since_epoch);

    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02} UTC",
        year, month, day, hours, minutes, seconds
    )
}

fn days_to_ymd(days: u64) -> (u64, u64, u64) {
    let mut remaining = days as i64;
    let mut year = 1970i64;

    loop {
        let days_in_year = if is_leap_year(year) { 366 } else { 365 };
        if remaining < days_in_year {
            break;
        }
        remaining -= days_in_year;
        year += 1;
    }

    let days_in_months: [i64; 12] = if is_leap_year(year) {
        [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
    } else {
        [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
    };

    let mut month = 1i64;
    for days in days_in_months {
        if remaining < days {
            break;
        }
        remaining -= days;
        month += 1;
    }

    (year as u64, month as u64, (remaining + 1) as u64)
}

fn is_leap_year(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

fn version_long() -> String {
    format!(
        "{} (built {} git:{})",
        env!("CARGO_PKG_VERSION"),
        format_build_time(),
        GIT_HASH
    )
}

#[derive(Parser)]
#[command(name = "bowcheckpoint")]
#[command(author, version, about = "Block-level checkpoint/rollback engine for A/B storage daemons", long_about = None)]
struct Cli {
    /// Path to the fstab-like descriptor (default: /etc/fstab)
    #[arg(long, global = true)]
    fstab: Option<String>,

    /// Path to the kernel mount table (default: /proc/mounts)
    #[arg(long, global = true)]
    mount_table: Option<String>,

    /// Path to the persisted checkpoint metadata file
    #[arg(long, global = true)]
    metadata_path: Option<String>,

    /// Daemon name used to namespace the committed property
    #[arg(long, global = true)]
    daemon_name: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print whether checkpointing is supported and the current metadata state
    Status,

    /// Arm a checkpoint with the given retry budget (-1 arms a slot-scoped rollback)
    Start {
        #[arg(long)]
        retry: i64,
    },

    /// Exit 0 if a checkpoint/rollback is needed on this boot, 1 otherwise
    NeedsCheckpoint,

    /// Exit 0 if a rollback should be performed on this boot, 1 otherwise
    NeedsRollback,

    /// Decrement the retry counter for this boot attempt
    MarkBootAttempt,

    /// Prepare all block-mode checkpointing mounts for the risky window
    Prepare,

    /// Commit the in-progress checkpoint, making writes permanent
    Commit,

    /// Abort the in-progress checkpoint by rebooting the system
    Abort {
        /// Required confirmation, since this reboots the system
        #[arg(long)]
        yes: bool,
    },

    /// Replay a bow log to roll back writes made during the checkpoint window
    Restore {
        /// Path to the block device or image file
        device: String,
    },

    /// Show detailed version and build information
    Version,
}

fn build_config(cli: &Cli) -> Config {
    let default = Config::default();
    Config {
        daemon_name: cli.daemon_name.clone().unwrap_or(default.daemon_name),
        metadata_path: cli
            .metadata_path
            .clone()
            .map(Into::into)
            .unwrap_or(default.metadata_path),
        mount_table_path: cli
            .mount_table
            .clone()
            .map(Into::into)
            .unwrap_or(default.mount_table_path),
        fstab_path: cli.fstab.clone().map(Into::into).unwrap_or(default.fstab_path),
    }
}

fn build_manager(cli: &Cli) -> Result<CheckpointManager> {
    let config = build_config(cli);
    let fstab = load_fstab(&config.fstab_path)
        .with_context(|| format!("failed to load fstab from {}", config.fstab_path.display()))?;

    Ok(CheckpointManager::new(
        config.clone(),
        fstab,
        None, // no boot-control HAL binding in this standalone CLI
        Box::new(LinuxRebootHook),
        Box::new(FilePropertySetter::new("/metadata/bowcheckpoint/properties")),
    ))
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Status => {
            let manager = build_manager(&cli)?;
            println!("supports checkpointing: {}", manager.supports());
            println!("checkpoint in progress: {}", manager.is_checkpointing());
        }

        Commands::Start { retry } => {
            let manager = build_manager(&cli)?;
            manager
                .start(*retry)
                .context("failed to start checkpoint")?;
            println!("checkpoint armed (retry={retry})");
        }

        Commands::NeedsCheckpoint => {
            let manager = build_manager(&cli)?;
            let needed = manager
                .needs_checkpoint()
                .context("failed to evaluate needs_checkpoint")?;
            println!("{needed}");
            if !needed {
                std::process::exit(1);
            }
        }

        Commands::NeedsRollback => {
            let manager = build_manager(&cli)?;
            let needed = manager
                .needs_rollback()
                .context("failed to evaluate needs_rollback")?;
            println!("{needed}");
            if !needed {
                std::process::exit(1);
            }
        }

        Commands::MarkBootAttempt => {
            let manager = build_manager(&cli)?;
            manager
                .mark_boot_attempt()
                .context("failed to mark boot attempt")?;
        }

        Commands::Prepare => {
            let manager = build_manager(&cli)?;
            manager.prepare().context("failed to prepare checkpoint")?;
        }

        Commands::Commit => {
            let manager = build_manager(&cli)?;
            manager.commit().context("failed to commit checkpoint")?;
            println!("checkpoint committed");
        }

        Commands::Abort { yes } => {
            if !*yes {
                anyhow::bail!("abort reboots the system immediately; pass --yes to confirm");
            }
            let manager = build_manager(&cli)?;
            log::warn!("aborting checkpoint: rebooting now");
            manager.abort();
        }

        Commands::Restore { device } => {
            RestoreEngine::restore(device)
                .with_context(|| format!("failed to restore bow log on {device}"))?;
            println!("restore complete: {device}");
        }

        Commands::Version => {
            println!("bowcheckpoint {}", version_long());
        }
    }

    Ok(())
}
