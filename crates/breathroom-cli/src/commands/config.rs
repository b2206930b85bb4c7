use breathroom_core::{Config, ConfigError};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print one value, e.g. `session.duration_minutes`
    Get { key: String },
    /// Change one value; it is validated before anything is written
    Set {
        key: String,
        /// New value; lists take JSON, e.g. '["rain","forest","Ocean"]'
        value: String,
    },
    /// Print every key with its current value
    List,
    /// Print where config.toml lives
    Path,
    /// Restore the default session, music and display settings
    Reset,
}

fn unknown_key(config: &Config, key: &str) -> Box<dyn std::error::Error> {
    format!(
        "{}\nknown keys: {}",
        ConfigError::UnknownKey(key.to_string()),
        config.keys().join(", ")
    )
    .into()
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config.get(&key).ok_or_else(|| unknown_key(&config, &key))?;
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            match config.set(&key, &value) {
                Err(ConfigError::UnknownKey(_)) => return Err(unknown_key(&config, &key)),
                other => other?,
            }
            config.save()?;
            let stored = config.get(&key).unwrap_or(value);
            println!("{key} = {stored}");
        }
        ConfigAction::List => {
            let config = Config::load()?;
            for key in config.keys() {
                if let Some(value) = config.get(&key) {
                    println!("{key} = {value}");
                }
            }
        }
        ConfigAction::Path => println!("{}", Config::path()?.display()),
        ConfigAction::Reset => {
            Config::default().save()?;
            println!("config reset to defaults ({})", Config::path()?.display());
        }
    }
    Ok(())
}
