use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

use sched_engine::{
    bookable_slots, format_in_timezone, get_timezone_by_country, project_events,
    validate_booking_time, CalendarGrid, Mentor, Snapshot,
};

#[derive(Parser)]
#[command(name = "sched")]
#[command(about = "Lesson scheduling toolkit: expand availability, check bookings, render calendars", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List a mentor's open bookable slots over a lookahead horizon
    Slots {
        /// JSON snapshot with mentors and bookings
        #[arg(long)]
        snapshot: PathBuf,
        #[arg(long)]
        mentor: String,
        #[arg(long, default_value_t = 14)]
        horizon_days: i64,
        /// Display timezone (defaults to the mentor's own)
        #[arg(long)]
        timezone: Option<String>,
        /// Anchor instant (RFC 3339); defaults to the current time
        #[arg(long)]
        now: Option<DateTime<Utc>>,
        #[arg(long)]
        json: bool,
    },
    /// Validate a prospective booking time against the snapshot
    Check {
        #[arg(long)]
        snapshot: PathBuf,
        #[arg(long)]
        mentor: String,
        /// Requested lesson start (RFC 3339)
        #[arg(long)]
        start: DateTime<Utc>,
        /// Lesson length in minutes
        #[arg(long, default_value_t = 60)]
        duration: i64,
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },
    /// Render calendar events for a viewer
    Calendar {
        #[arg(long)]
        snapshot: PathBuf,
        #[arg(long)]
        mentor: String,
        /// Participant id of the viewer (controls titles)
        #[arg(long)]
        viewer: String,
        #[arg(long)]
        timezone: Option<String>,
        #[arg(long, default_value_t = 14)]
        horizon_days: i64,
        #[arg(long)]
        now: Option<DateTime<Utc>>,
        #[arg(long)]
        json: bool,
    },
    /// Read an instant's wall clock in a timezone
    Convert {
        /// Instant to convert (RFC 3339)
        #[arg(long)]
        time: DateTime<Utc>,
        #[arg(long)]
        timezone: String,
    },
    /// Resolve a country code to its default timezone
    Zone { country: String },
}

fn load_snapshot(path: &PathBuf) -> anyhow::Result<Snapshot> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read snapshot {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("malformed snapshot {}", path.display()))
}

fn find_mentor<'a>(snapshot: &'a Snapshot, id: &str) -> anyhow::Result<&'a Mentor> {
    match snapshot.mentors.iter().find(|m| m.id == id) {
        Some(mentor) => Ok(mentor),
        None => bail!("no mentor '{id}' in snapshot"),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Slots {
            snapshot,
            mentor,
            horizon_days,
            timezone,
            now,
            json,
        } => {
            let snapshot = load_snapshot(&snapshot)?;
            let mentor = find_mentor(&snapshot, &mentor)?;
            let now = now.unwrap_or_else(Utc::now);
            let display_tz = timezone.unwrap_or_else(|| mentor.timezone.name().to_string());

            let open = bookable_slots(mentor, &snapshot.bookings, now, horizon_days);
            if json {
                println!("{}", serde_json::to_string_pretty(&open)?);
            } else if open.is_empty() {
                println!("No open slots in the next {horizon_days} days.");
            } else {
                for slot in &open {
                    println!(
                        "{}  ({} min)",
                        format_in_timezone(slot.start, &display_tz, "%a %Y-%m-%d %H:%M %Z")?,
                        slot.duration_minutes()
                    );
                }
            }
        }
        Commands::Check {
            snapshot,
            mentor,
            start,
            duration,
            now,
        } => {
            let snapshot = load_snapshot(&snapshot)?;
            let mentor = find_mentor(&snapshot, &mentor)?;
            let now = now.unwrap_or_else(Utc::now);
            validate_booking_time(mentor, &snapshot.bookings, start, duration, now)?;
            println!(
                "OK: {} for {duration} minutes is bookable with {}.",
                start.to_rfc3339(),
                mentor.name
            );
        }
        Commands::Calendar {
            snapshot,
            mentor,
            viewer,
            timezone,
            horizon_days,
            now,
            json,
        } => {
            let snapshot = load_snapshot(&snapshot)?;
            let mentor = find_mentor(&snapshot, &mentor)?;
            let now = now.unwrap_or_else(Utc::now);
            let display_tz = timezone.unwrap_or_else(|| mentor.timezone.name().to_string());

            let open = bookable_slots(mentor, &snapshot.bookings, now, horizon_days);
            let events = project_events(&open, &snapshot.bookings, mentor, &viewer, &snapshot.names);
            if json {
                println!("{}", serde_json::to_string_pretty(&events)?);
            } else {
                let tz = sched_engine::parse_timezone(&display_tz)?;
                let mut events = events;
                events.sort_by_key(|e| e.start);
                let grid = CalendarGrid::build(events, tz);
                for event in grid.events() {
                    println!(
                        "{}  {:<10} {}",
                        format_in_timezone(event.start, &display_tz, "%a %Y-%m-%d %H:%M")?,
                        event.kind.to_string(),
                        event.title
                    );
                }
            }
        }
        Commands::Convert { time, timezone } => {
            println!(
                "{}",
                format_in_timezone(time, &timezone, "%Y-%m-%d %H:%M %Z")?
            );
        }
        Commands::Zone { country } => {
            println!("{}", get_timezone_by_country(&country).name());
        }
    }

    Ok(())
}
