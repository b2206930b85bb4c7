use std::time::Duration;

use breathroom_core::session::parse_duration_minutes;
use breathroom_core::storage::{Database, SessionEntry};
use breathroom_core::timer::PREPARATION_MS;
use breathroom_core::{
    BreathSession, Config, SessionConfig, SessionEvent, SessionPlan, TimerService, VirtualClock,
};
use chrono::{Local, Utc};
use clap::Subcommand;
use serde::Serialize;

use crate::terminal::TerminalSink;

#[derive(Subcommand)]
pub enum SessionAction {
    /// Run a breathing session in this terminal
    Start {
        /// Session length in minutes (default from config)
        #[arg(long, value_parser = parse_minutes)]
        minutes: Option<u32>,
        /// Background music track, or "none" (default from config)
        #[arg(long)]
        music: Option<String>,
        /// Print presentation and events as JSON lines
        #[arg(long)]
        json: bool,
        /// Do not read or write the streak and history database
        #[arg(long)]
        ephemeral: bool,
    },
    /// Show the cycle plan for a duration
    Plan {
        #[arg(long, value_parser = parse_minutes)]
        minutes: Option<u32>,
    },
}

fn parse_minutes(raw: &str) -> Result<u32, String> {
    parse_duration_minutes(raw).map_err(|e| e.to_string())
}

#[derive(Serialize)]
struct PlanOutput {
    duration_minutes: u32,
    total_cycles: u64,
    total_duration_ms: u64,
    preparation_ms: u64,
}

pub fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();

    match action {
        SessionAction::Start {
            minutes,
            music,
            json,
            ephemeral,
        } => {
            let session_config = config.session_config(minutes, music.as_deref())?;
            let db = if ephemeral {
                Database::open_memory()?
            } else {
                Database::open()?
            };
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            runtime.block_on(run_live(session_config, db, &config, json))
        }
        SessionAction::Plan { minutes } => {
            let duration_minutes = minutes.unwrap_or(config.session.duration_minutes);
            let plan = SessionPlan::for_minutes(duration_minutes);
            let output = PlanOutput {
                duration_minutes,
                total_cycles: plan.total_cycles,
                total_duration_ms: plan.total_duration_ms,
                preparation_ms: PREPARATION_MS,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
    }
}

fn emit(json: bool, event: &SessionEvent) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string(event)?);
    }
    Ok(())
}

/// Drive the session against wall-clock time until it completes or Ctrl-C.
async fn run_live(
    session_config: SessionConfig,
    db: Database,
    config: &Config,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = BreathSession::new(
        VirtualClock::new(),
        TerminalSink::new(json).with_streak(config.display.show_streak),
        db,
    )
    .with_visual_intensity(config.display.visual_intensity);

    let origin = tokio::time::Instant::now();
    let started_at = Utc::now();
    let started = session.start(session_config.clone())?;
    emit(json, &started)?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut finished: Option<SessionEvent> = None;
    while finished.is_none() {
        let Some(next_due) = session.clock().next_due() else {
            break;
        };
        let deadline = origin + Duration::from_millis(next_due);

        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => {
                let elapsed = u64::try_from(origin.elapsed().as_millis()).unwrap_or(u64::MAX);
                for event in session.advance_to(elapsed.max(next_due)) {
                    emit(json, &event)?;
                    if event.is_terminal() {
                        finished = Some(event);
                    }
                }
            }
            _ = &mut ctrl_c => {
                finished = session.abort();
                if let Some(event) = &finished {
                    emit(json, event)?;
                }
            }
        }
    }

    let Some(outcome) = finished else {
        return Ok(());
    };
    let (completed, cycles) = match outcome {
        SessionEvent::SessionCompleted { cycles, .. } => (true, cycles),
        SessionEvent::SessionAborted { cycles, .. } => (false, cycles),
        _ => return Ok(()),
    };
    let entry = SessionEntry {
        duration_min: session_config.duration_minutes,
        cycles,
        completed,
        music: session_config.music.track().map(str::to_string),
        session_date: Local::now().date_naive(),
        started_at,
        ended_at: Utc::now(),
    };
    if let Err(e) = session.store().record_session(&entry) {
        tracing::error!(error = %e, "failed to record session history");
    }
    Ok(())
}
