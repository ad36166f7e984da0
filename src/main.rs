//! Wearlog CLI
//!
//! Scheduled wearable sensor sessions for research.

use chrono::{Local, TimeZone};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use wearlog::{
    clock::SystemClock,
    config::Config,
    core::{parse_session_line, SessionController, SessionLine, DEFAULT_ROSTER, SESSION_LOG},
    provider::{simulated::SimulatedConfig, SimulatedProvider},
    schedule::{SessionEvent, SessionRunner, SessionSchedule},
    sink::DirectorySink,
    survey::SurveyAnswers,
    transparency::create_shared_log_with_persistence,
    DATA_DECLARATION, VERSION,
};

#[derive(Parser)]
#[command(name = "wearlog")]
#[command(version = VERSION)]
#[command(about = "Scheduled wearable sensor sessions logged for research", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start recording sessions
    Start {
        /// Participant number written on every row
        #[arg(long)]
        user: u32,

        /// Stop after this many sessions (runs until Ctrl+C otherwise)
        #[arg(long)]
        sessions: Option<u32>,

        /// Record id of the first session
        #[arg(long, default_value = "1")]
        first_record: u32,

        /// Start the first session immediately and skip waits between sessions
        #[arg(long)]
        no_delay: bool,
    },

    /// Save post-session questionnaire answers
    Survey {
        #[arg(long)]
        user: u32,

        #[arg(long)]
        record: u32,

        /// Whether the participant was watching TV
        #[arg(long, action = clap::ArgAction::Set)]
        watching_tv: bool,

        /// Mood rating (0-4)
        #[arg(long)]
        mood: u8,

        /// Fatigue rating (0-4)
        #[arg(long)]
        fatigue: u8,
    },

    /// Summarise recorded sessions
    Sessions {
        /// Log directory (defaults to the configured output path)
        #[arg(long, short)]
        dir: Option<PathBuf>,
    },

    /// List the recorded sensors
    Roster,

    /// Show configuration and collection totals
    Status,

    /// Show configuration
    Config {
        /// Write the current (or default) configuration to disk
        #[arg(long)]
        write: bool,
    },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Start {
            user,
            sessions,
            first_record,
            no_delay,
        } => {
            cmd_start(user, sessions, first_record, no_delay);
        }
        Commands::Survey {
            user,
            record,
            watching_tv,
            mood,
            fatigue,
        } => {
            cmd_survey(user, record, watching_tv, mood, fatigue);
        }
        Commands::Sessions { dir } => {
            cmd_sessions(dir);
        }
        Commands::Roster => {
            cmd_roster();
        }
        Commands::Status => {
            cmd_status();
        }
        Commands::Config { write } => {
            cmd_config(write);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();
}

fn load_config() -> Config {
    match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: {e}; using default configuration");
            Config::default()
        }
    }
}

fn cmd_start(user: u32, sessions: Option<u32>, first_record: u32, no_delay: bool) {
    println!("Wearlog v{VERSION}");
    println!("{DATA_DECLARATION}");

    if user == 0 {
        eprintln!("Error: participant numbers start at 1");
        std::process::exit(1);
    }

    let config = load_config();
    if let Err(e) = config.validate() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    let provider = Arc::new(SimulatedProvider::new(SimulatedConfig {
        sample_interval: config.sample_interval,
        trigger_interval: config.trigger_interval,
    }));
    let controller = match SessionController::new(
        &DEFAULT_ROSTER,
        provider,
        Arc::new(SystemClock::new()),
        Arc::new(DirectorySink::new(&config.output_path)),
    ) {
        Ok(controller) => controller,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let schedule = if no_delay {
        SessionSchedule::immediate(config.session_duration)
    } else {
        SessionSchedule::from_config(&config)
    };

    println!("Participant: {user}");
    println!("Sensors: {}", controller.channels().len());
    println!("Session duration: {}s", schedule.session_duration.as_secs());
    println!("Logs: {:?}", config.output_path);
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let transparency_log =
        create_shared_log_with_persistence(config.data_path.join("transparency.json"));

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone());

    let mut runner = SessionRunner::new(
        controller,
        schedule,
        user,
        first_record,
        transparency_log.clone(),
    );

    let result = runner.run(&running, sessions, |event| match event {
        SessionEvent::Waiting { record_id, delay } => {
            if !delay.is_zero() {
                println!("Session {record_id} starts in {}s", delay.as_secs());
            }
        }
        SessionEvent::Started { record_id } => {
            println!(
                "[{}] Session {record_id} recording...",
                Local::now().format("%H:%M:%S")
            );
        }
        SessionEvent::WindowElapsed { record_id } => {
            println!(
                "[{}] Session {record_id} complete",
                Local::now().format("%H:%M:%S")
            );
        }
        SessionEvent::Flushed(summary) => {
            println!(
                "Session {} saved: {} records from {} sensors",
                summary.record_id,
                summary.total_records(),
                summary.channels.len()
            );
            println!(
                "Run `wearlog survey --user {} --record {}` to add the evaluation",
                summary.user_id, summary.record_id
            );
        }
        SessionEvent::FlushFailed { record_id, message } => {
            eprintln!("Error saving session {record_id}: {message}");
        }
        SessionEvent::Interrupted { record_id } => {
            println!("Session {record_id} interrupted; recorded data was saved");
        }
    });

    match result {
        Ok(summary) => {
            println!();
            println!(
                "Stopped after {} session(s), {} records written",
                summary.sessions, summary.records_written
            );
        }
        Err(e) => {
            eprintln!("Error: {e}");
        }
    }

    if let Err(e) = transparency_log.save() {
        eprintln!("Warning: Could not save transparency log: {e}");
    }

    println!();
    println!("{}", transparency_log.summary());
}

fn cmd_survey(user: u32, record: u32, watching_tv: bool, mood: u8, fatigue: u8) {
    if user == 0 {
        eprintln!("Error: participant numbers start at 1");
        std::process::exit(1);
    }

    let answers = match SurveyAnswers::new(watching_tv, mood, fatigue) {
        Ok(answers) => answers,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let config = load_config();
    let sink = DirectorySink::new(&config.output_path);
    if let Err(e) = answers.append(&sink, &SystemClock::new(), user, record) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    let transparency_log =
        create_shared_log_with_persistence(config.data_path.join("transparency.json"));
    transparency_log.record_survey();
    if let Err(e) = transparency_log.save() {
        eprintln!("Warning: Could not save transparency log: {e}");
    }

    println!("Saved answers for participant {user}, session {record}");
}

fn cmd_sessions(dir: Option<PathBuf>) {
    let dir = dir.unwrap_or_else(|| load_config().output_path);
    let sink = DirectorySink::new(&dir);
    let path = sink.log_path(SESSION_LOG);

    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(_) => {
            println!("No session data found in {dir:?}");
            println!("Run 'wearlog start' to begin recording.");
            return;
        }
    };

    let mut sessions: BTreeMap<(u32, u32), Vec<SessionLine>> = BTreeMap::new();
    for line in content.lines().filter(|l| !l.trim().is_empty()) {
        match parse_session_line(line) {
            Ok(parsed) => sessions
                .entry((parsed.user_id, parsed.record_id))
                .or_default()
                .push(parsed),
            Err(e) => tracing::warn!(error = %e, "skipping line"),
        }
    }

    println!("{:>6} {:>8} {:>9} {:>10}  flushed at", "user", "record", "sensors", "duration");
    for ((user, record), lines) in &sessions {
        let duration = lines
            .iter()
            .filter_map(SessionLine::duration_secs)
            .fold(0.0_f64, f64::max);
        let flushed_at = lines
            .iter()
            .map(|l| l.wall_clock_millis)
            .max()
            .and_then(|millis| Local.timestamp_millis_opt(millis).single())
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());

        println!(
            "{:>6} {:>8} {:>9} {:>9.1}s  {}",
            user,
            record,
            lines.len(),
            duration,
            flushed_at
        );
    }
    println!();
    println!("{} session(s) in {:?}", sessions.len(), path);
}

fn cmd_roster() {
    println!("{:>6}  {:<24} {:<8} {:<8}", "type", "label", "wake-up", "style");
    for spec in DEFAULT_ROSTER.iter() {
        println!(
            "{:>6}  {:<24} {:<8} {:<8}",
            spec.kind,
            spec.label,
            if spec.wake_up { "yes" } else { "no" },
            if spec.trigger { "trigger" } else { "stream" }
        );
    }
}

fn cmd_status() {
    let config = load_config();

    println!("Wearlog Status");
    println!("==============");
    println!();
    println!("Configuration:");
    println!("  Log directory: {:?}", config.output_path);
    println!("  Session duration: {}s", config.session_duration.as_secs());
    println!("  First session delay: {}s", config.first_session_delay.as_secs());
    println!(
        "  Delay between sessions: {}s",
        config.subsequent_session_delay.as_secs()
    );
    println!();

    let stats_path = config.data_path.join("transparency.json");
    if stats_path.exists() {
        if let Ok(content) = std::fs::read_to_string(&stats_path) {
            if let Ok(stats) = serde_json::from_str::<serde_json::Value>(&content) {
                println!("Cumulative Statistics:");
                for (key, label) in [
                    ("sessions_started", "Sessions started"),
                    ("sessions_flushed", "Sessions flushed"),
                    ("records_written", "Sensor records written"),
                    ("flush_failures", "Failed channel flushes"),
                    ("surveys_written", "Survey answers written"),
                ] {
                    if let Some(value) = stats.get(key) {
                        println!("  {label}: {value}");
                    }
                }
            }
        }
    } else {
        println!("No previous session data found.");
    }
}

fn cmd_config(write: bool) {
    let config = load_config();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );

    if write {
        match config.save() {
            Ok(()) => println!("\nWritten to {:?}", Config::config_path()),
            Err(e) => {
                eprintln!("Error saving config: {e}");
                std::process::exit(1);
            }
        }
    }
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl+C handler");
}
