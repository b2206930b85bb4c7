use breathroom_core::{Database, StreakRecord, StreakStore};
use chrono::Local;
use clap::Subcommand;
use serde::Serialize;

#[derive(Subcommand)]
pub enum StreakAction {
    /// Show the stored streak and the count valid today
    Show,
    /// Forget the streak
    Reset,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StreakOutput {
    #[serde(flatten)]
    record: StreakRecord,
    live_count: u32,
}

pub fn run(action: StreakAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut db = Database::open()?;

    match action {
        StreakAction::Show => {
            let record = db.load()?;
            let live_count = record.live_count(Local::now().date_naive());
            let output = StreakOutput { record, live_count };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        StreakAction::Reset => {
            db.save(&StreakRecord::default())?;
            println!("streak reset");
        }
    }
    Ok(())
}
