use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use futures::executor::block_on;
use kikyo_settings::drag::{DragReorderController, PointerEvent, ReorderSurface, StackedRows};
use kikyo_settings::local_backend::{FileLoader, LocalBackend};
use kikyo_settings::local_store::JsonFileStore;
use kikyo_settings::profile::{ImeMode, SinglePress, SuspendKey, ThumbKeySelect};
use kikyo_settings::{
    BackendGateway, FieldEdit, LayoutEntryList, LayoutId, SettingsSession, ThumbSide,
};
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

const ROW_HEIGHT: f64 = 32.0;

#[derive(Parser, Debug)]
#[command(name = "kikyo-settings", version, about = "Manage Kikyo layouts and input profile")]
struct Cli {
    /// Directory holding settings.json and the client-local store.
    #[arg(long)]
    config_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show engine state, version and registered layouts.
    Status,
    /// List layout entries in order.
    List,
    /// Register a layout file.
    Add { path: String },
    /// Change alias and/or path of an entry.
    Update {
        id: String,
        #[arg(long, default_value = "")]
        alias: String,
        #[arg(long)]
        path: Option<String>,
    },
    Delete { id: String },
    /// Make an entry active and load its layout.
    Activate { id: String },
    /// Move an entry to the position another entry holds.
    Move { source: String, target: String },
    /// Load a layout file without registering it.
    Load { path: String },
    /// Print the input profile.
    Profile,
    /// Edit one profile field and save.
    Set {
        #[command(subcommand)]
        field: SetField,
    },
    Enable,
    Disable,
    /// Show or change launch at login.
    Autostart { on: Option<bool> },
    Version,
}

#[derive(Subcommand, Debug)]
enum SetField {
    /// Thumb key assignment, e.g. `thumb-key left Muhenkan`.
    ThumbKey {
        side: ThumbSide,
        #[arg(value_parser = parse_serde::<ThumbKeySelect>)]
        key: ThumbKeySelect,
    },
    Continuous {
        side: ThumbSide,
        #[arg(action = ArgAction::Set)]
        on: bool,
    },
    /// One of None, Enable, PrefixShift, SpaceKey.
    SinglePress {
        side: ThumbSide,
        #[arg(value_parser = parse_serde::<SinglePress>)]
        mode: SinglePress,
    },
    Repeat {
        side: ThumbSide,
        #[arg(action = ArgAction::Set)]
        on: bool,
    },
    CharRepeatAssigned {
        #[arg(action = ArgAction::Set)]
        on: bool,
    },
    CharRepeatUnassigned {
        #[arg(action = ArgAction::Set)]
        on: bool,
    },
    CharContinuous {
        #[arg(action = ArgAction::Set)]
        on: bool,
    },
    CharOverlap { percent: u32 },
    ThumbOverlap { percent: u32 },
    Ime {
        #[arg(value_parser = parse_serde::<ImeMode>)]
        mode: ImeMode,
    },
    SuspendKey {
        #[arg(value_parser = parse_serde::<SuspendKey>)]
        key: SuspendKey,
    },
}

impl From<SetField> for FieldEdit {
    fn from(field: SetField) -> Self {
        match field {
            SetField::ThumbKey { side, key } => FieldEdit::ThumbKey(side, key),
            SetField::Continuous { side, on } => FieldEdit::ThumbContinuous(side, on),
            SetField::SinglePress { side, mode } => FieldEdit::ThumbSinglePress(side, mode),
            SetField::Repeat { side, on } => FieldEdit::ThumbRepeat(side, on),
            SetField::CharRepeatAssigned { on } => FieldEdit::CharRepeatAssigned(on),
            SetField::CharRepeatUnassigned { on } => FieldEdit::CharRepeatUnassigned(on),
            SetField::CharContinuous { on } => FieldEdit::CharContinuous(on),
            SetField::CharOverlap { percent } => FieldEdit::CharOverlapPercent(percent),
            SetField::ThumbOverlap { percent } => FieldEdit::ThumbShiftOverlapPercent(percent),
            SetField::Ime { mode } => FieldEdit::ImeMode(mode),
            SetField::SuspendKey { key } => FieldEdit::SuspendKey(key),
        }
    }
}

fn parse_serde<T: DeserializeOwned>(raw: &str) -> std::result::Result<T, String> {
    serde_json::from_value(serde_json::Value::String(raw.to_string())).map_err(|e| e.to_string())
}

fn config_dir(cli: &Cli) -> Result<PathBuf> {
    match &cli.config_dir {
        Some(dir) => Ok(dir.clone()),
        None => dirs::config_dir()
            .map(|dir| dir.join("kikyo"))
            .ok_or_else(|| anyhow!("no config directory on this platform; pass --config-dir")),
    }
}

fn print_list(list: &LayoutEntryList) {
    let snapshot = list.snapshot();
    if snapshot.entries.is_empty() {
        println!("(no layouts registered)");
        return;
    }
    for entry in &snapshot.entries {
        let marker = if snapshot.active_id.as_ref() == Some(&entry.id) {
            '*'
        } else {
            ' '
        };
        println!(
            "{} {:>2}  {:<24} {}  [{}]",
            marker,
            entry.order,
            entry.display_name(),
            entry.path,
            entry.id
        );
    }
}

/// Replays a drag of `source` onto `target` through the reorder controller.
async fn drag_move(list: &LayoutEntryList, source: &LayoutId, target: &LayoutId) -> Result<bool> {
    let mut drag = DragReorderController::new(StackedRows::new(0.0, ROW_HEIGHT));
    drag.surface_mut().render(&list.snapshot());

    let from = drag
        .surface()
        .row_center(source)
        .with_context(|| format!("unknown layout id {source}"))?;
    let to = drag
        .surface()
        .row_center(target)
        .with_context(|| format!("unknown layout id {target}"))?;

    drag.pointer_down(PointerEvent::primary(1, 0.0, from), source);
    drag.pointer_move(PointerEvent::primary(1, 0.0, to));
    Ok(drag.commit(PointerEvent::primary(1, 0.0, to), list).await?)
}

async fn run(cli: Cli, session: &SettingsSession) -> Result<()> {
    let layouts = session.layouts();
    match cli.command {
        Command::Status => {
            println!(
                "engine:    {}",
                if session.enabled() { "enabled" } else { "paused" }
            );
            println!(
                "version:   {}",
                session.app_version().unwrap_or_else(|| "unknown".to_string())
            );
            if let Some(path) = session.last_layout_path() {
                println!("last file: {path}");
            }
            print_list(layouts);
        }
        Command::List => print_list(layouts),
        Command::Add { path } => {
            let entry = layouts.create(&path).await?;
            println!("added {} ({})", entry.display_name(), entry.id);
        }
        Command::Update { id, alias, path } => {
            let id = LayoutId::new(id);
            let path = match path {
                Some(path) => path,
                None => layouts
                    .entries()
                    .into_iter()
                    .find(|entry| entry.id == id)
                    .map(|entry| entry.path)
                    .with_context(|| format!("unknown layout id {id}"))?,
            };
            layouts.update(&id, &alias, &path).await?;
            print_list(layouts);
        }
        Command::Delete { id } => {
            layouts.delete(&LayoutId::new(id)).await?;
            print_list(layouts);
        }
        Command::Activate { id } => {
            let result = layouts.activate(&LayoutId::new(id)).await?;
            println!("{result}");
        }
        Command::Move { source, target } => {
            let moved = drag_move(layouts, &LayoutId::new(source), &LayoutId::new(target)).await?;
            if !moved {
                println!("order unchanged");
            }
            print_list(layouts);
        }
        Command::Load { path } => {
            let result = session.load_layout_file(&path).await?;
            println!("{result}");
        }
        Command::Profile => {
            println!("{}", serde_json::to_string_pretty(&session.profile().profile())?);
        }
        Command::Set { field } => {
            let outcome = session.profile().edit(field.into()).await?;
            debug!("profile save: {:?}", outcome);
        }
        Command::Enable => session.set_enabled(true).await?,
        Command::Disable => session.set_enabled(false).await?,
        Command::Autostart { on } => {
            if let Some(on) = on {
                session.set_autostart(on).await?;
            }
            println!("autostart: {}", session.autostart_enabled().await?);
        }
        Command::Version => {
            println!(
                "{}",
                session.app_version().unwrap_or_else(|| "unknown".to_string())
            );
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let dir = config_dir(&cli)?;
    debug!("config dir: {}", dir.display());

    let (backend, events) = LocalBackend::open(dir.join("settings.json"));
    let backend = Arc::new(backend.with_loader(FileLoader));
    let session = SettingsSession::new(
        BackendGateway::new(backend),
        Arc::new(JsonFileStore::open(dir.join("client.json"))),
    )
    .with_events(events);

    let failures = block_on(session.start());
    if !failures.is_empty() {
        for failure in &failures {
            warn!("startup: {}", failure);
        }
        bail!("could not read settings ({} failures)", failures.len());
    }

    block_on(run(cli, &session))?;
    session.pump_events();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn set_single_press_parses_to_field_edit() {
        let cli = Cli::parse_from(["kikyo-settings", "set", "single-press", "left", "None"]);
        let Command::Set { field } = cli.command else {
            panic!("expected set");
        };
        assert_eq!(
            FieldEdit::from(field),
            FieldEdit::ThumbSinglePress(ThumbSide::Left, SinglePress::Disable)
        );
    }

    #[test]
    fn set_repeat_takes_explicit_bool() {
        let cli = Cli::parse_from(["kikyo-settings", "set", "repeat", "ext1", "false"]);
        let Command::Set { field } = cli.command else {
            panic!("expected set");
        };
        assert_eq!(
            FieldEdit::from(field),
            FieldEdit::ThumbRepeat(ThumbSide::Ext1, false)
        );
    }
}
