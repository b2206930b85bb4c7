use breathroom_core::Database;
use chrono::Local;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's statistics
    Today,
    /// All-time statistics
    All,
    /// Most recent sessions, newest first
    History {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    let json = match action {
        StatsAction::Today => {
            let stats = db.stats_on(Local::now().date_naive())?;
            serde_json::to_string_pretty(&stats)?
        }
        StatsAction::All => serde_json::to_string_pretty(&db.stats_all()?)?,
        StatsAction::History { limit } => {
            serde_json::to_string_pretty(&db.recent_sessions(limit)?)?
        }
    };
    println!("{json}");
    Ok(())
}
