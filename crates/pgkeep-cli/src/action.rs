//! CLI actions and their handlers
//!
//! Every handler returns the process exit code. Engine errors propagate to
//! `main`, which reports them and exits 1.

use anyhow::{Result, bail};
use pgkeep_standards::StandardsEngine;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;

use crate::output;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Health,
    Validate,
    Fix,
    Standards,
    EventTriggers,
    GenerateMigration,
    Install,
}

impl Action {
    pub const ALL: [Action; 7] = [
        Action::Health,
        Action::Validate,
        Action::Fix,
        Action::Standards,
        Action::EventTriggers,
        Action::GenerateMigration,
        Action::Install,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Action::Health => "health",
            Action::Validate => "validate",
            Action::Fix => "fix",
            Action::Standards => "standards",
            Action::EventTriggers => "event-triggers",
            Action::GenerateMigration => "generate-migration",
            Action::Install => "install",
        }
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(Action::name).collect()
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Action {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_lowercase();
        match Self::ALL.iter().find(|action| action.name() == name) {
            Some(action) => Ok(*action),
            None => bail!(
                "unknown action '{}'; valid actions: {}",
                s,
                Self::names().join(", ")
            ),
        }
    }
}

/// Desired event trigger state from `--enable` / `--disable`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Enable,
    Disable,
    Status,
}

impl Toggle {
    pub fn from_flags(enable: bool, disable: bool) -> Result<Self> {
        match (enable, disable) {
            (true, true) => bail!("--enable and --disable cannot be used together"),
            (true, false) => Ok(Toggle::Enable),
            (false, true) => Ok(Toggle::Disable),
            (false, false) => Ok(Toggle::Status),
        }
    }
}

/// Flags shared by all actions
#[derive(Debug, Clone)]
pub struct ActionOptions {
    pub tables: Vec<String>,
    pub dry_run: bool,
    pub toggle: Toggle,
    pub assume_yes: bool,
    pub verbose: bool,
    pub json: bool,
    pub output_dir: PathBuf,
}

impl ActionOptions {
    fn tables(&self) -> Option<&[String]> {
        if self.tables.is_empty() {
            None
        } else {
            Some(self.tables.as_slice())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn prompt_yes_no(label: &str) -> Result<bool> {
    print!("{label} [y/N]: ");
    std::io::stdout().flush()?;
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(matches!(input.trim().to_lowercase().as_str(), "y" | "yes"))
}

pub async fn execute(action: Action, engine: &StandardsEngine, options: &ActionOptions) -> Result<i32> {
    tracing::debug!(action = %action, tables = ?options.tables, "running action");

    let code = match action {
        Action::Health => health(engine, options).await?,
        Action::Validate => validate(engine, options).await?,
        Action::Fix => fix(engine, options).await?,
        Action::Standards => standards(engine, options).await?,
        Action::EventTriggers => event_triggers(engine, options).await?,
        Action::GenerateMigration => generate_migration(engine, options).await?,
        Action::Install => install(engine, options).await?,
    };

    if options.verbose && !options.json {
        print!("\n{}", output::render_stats(&engine.operation_stats()));
    }

    Ok(code)
}

async fn health(engine: &StandardsEngine, options: &ActionOptions) -> Result<i32> {
    let health = engine.run_health_check().await?;
    if options.json {
        print_json(&health)?;
    } else {
        print!("{}", output::render_health(&health, options.verbose));
    }
    Ok(0)
}

async fn validate(engine: &StandardsEngine, options: &ActionOptions) -> Result<i32> {
    let report = engine.validate_structure(options.tables()).await?;
    if options.json {
        print_json(&report.summary())?;
    } else {
        print!("{}", output::render_validation(&report));
    }
    Ok(if report.valid() { 0 } else { 1 })
}

async fn fix(engine: &StandardsEngine, options: &ActionOptions) -> Result<i32> {
    let tables = options.tables();
    if tables.is_none() && !engine.settings().auto_standards.selective_fixing {
        engine.fix_all().await?;
        if options.json {
            print_json(&serde_json::json!({ "fixed": "all" }))?;
        } else {
            println!("Applied standards to the whole database");
        }
        return Ok(0);
    }

    let sequences = engine.fix_sequences(tables).await?;
    let triggers = engine.fix_triggers(tables).await?;

    if options.json {
        print_json(&serde_json::json!({
            "sequences_fixed": sequences.sequences_fixed,
            "triggers_created": triggers.created(),
            "triggers_skipped": triggers.skipped(),
        }))?;
    } else {
        print!("{}", output::render_sequences(&sequences));
        print!("{}", output::render_triggers(&triggers));
    }
    Ok(0)
}

async fn standards(engine: &StandardsEngine, options: &ActionOptions) -> Result<i32> {
    let report = engine
        .apply_best_practices(options.tables(), options.dry_run)
        .await?;
    if options.json {
        print_json(&report)?;
    } else {
        print!("{}", output::render_best_practices(&report));
    }
    Ok(0)
}

async fn event_triggers(engine: &StandardsEngine, options: &ActionOptions) -> Result<i32> {
    let status = match options.toggle {
        Toggle::Status => {
            let enabled = engine.event_triggers_enabled().await?;
            if options.json {
                print_json(&serde_json::json!({ "enabled": enabled }))?;
            } else if enabled {
                println!("Event triggers are enabled");
            } else {
                println!("Event triggers are disabled");
            }
            return Ok(0);
        }
        Toggle::Enable => {
            if !options.assume_yes
                && !prompt_yes_no("Create an event trigger that applies standards to every new table?")?
            {
                println!("Aborted, no changes made");
                return Ok(0);
            }
            engine.enable_event_triggers(true).await?
        }
        Toggle::Disable => engine.enable_event_triggers(false).await?,
    };

    if options.json {
        print_json(&status)?;
    } else {
        println!("{}", status.message);
    }
    Ok(0)
}

async fn generate_migration(engine: &StandardsEngine, options: &ActionOptions) -> Result<i32> {
    let generated = engine
        .generate_standards_migration(&options.output_dir)
        .await?;

    match generated {
        Some(migration) if options.json => print_json(&migration)?,
        Some(migration) => {
            println!("Created migration: {}", migration.path.display());
            println!("Tables:");
            for table in &migration.tables {
                println!("  - {table}");
            }
        }
        None if options.json => print_json(&serde_json::Value::Null)?,
        None => println!("All tables already have PostgreSQL standards applied."),
    }
    Ok(0)
}

async fn install(engine: &StandardsEngine, options: &ActionOptions) -> Result<i32> {
    engine.install_functions().await?;
    if options.json {
        print_json(&serde_json::json!({ "installed": true }))?;
    } else {
        println!("Installed PostgreSQL helper functions");
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_every_action() {
        for action in Action::ALL {
            assert_eq!(action.name().parse::<Action>().unwrap(), action);
        }
        assert_eq!(" Event-Triggers ".parse::<Action>().unwrap(), Action::EventTriggers);
    }

    #[test]
    fn test_unknown_action_lists_valid_ones() {
        let err = "vacuum".parse::<Action>().unwrap_err().to_string();
        assert!(err.contains("unknown action 'vacuum'"));
        assert!(err.contains("generate-migration"));
    }

    #[test]
    fn test_toggle_flags() {
        assert_eq!(Toggle::from_flags(true, false).unwrap(), Toggle::Enable);
        assert_eq!(Toggle::from_flags(false, true).unwrap(), Toggle::Disable);
        assert_eq!(Toggle::from_flags(false, false).unwrap(), Toggle::Status);
        assert!(Toggle::from_flags(true, true).is_err());
    }

    #[test]
    fn test_empty_table_list_means_all() {
        let options = ActionOptions {
            tables: vec![],
            dry_run: false,
            toggle: Toggle::Status,
            assume_yes: false,
            verbose: false,
            json: false,
            output_dir: PathBuf::from("database/migrations"),
        };
        assert!(options.tables().is_none());
    }
}
