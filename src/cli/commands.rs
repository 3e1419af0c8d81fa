//! Command implementations

use std::io;
use std::sync::Arc;

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::display::node_tree;
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, Settings};
use crate::domain::path::ROOT_PATH;
use crate::domain::{Node, PrefValue, PreferencePath, Preferences};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::persistence::from_json;

/// Execute a CLI command.
pub fn execute(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        Commands::Config { command } => cmd_config(command),
        command => {
            let container = build_container(cli)?;
            load(&container)?;
            match command {
                Commands::Get { path } => cmd_get(&container, path),
                Commands::Set { path, value } => cmd_set(&container, path, value),
                Commands::Unset { path } => cmd_unset(&container, path),
                Commands::Keys { node } => cmd_keys(&container, node),
                Commands::Tree { node, values } => cmd_tree(&container, node, *values),
                Commands::Rm { node } => cmd_rm(&container, node),
                Commands::Completion { .. } | Commands::Config { .. } => Ok(()),
            }
        }
    }
}

fn build_container(cli: &Cli) -> CliResult<ServiceContainer> {
    let mut settings = Settings::load()?;
    if let Some(file) = &cli.file {
        settings.location = file.clone();
    }
    Ok(ServiceContainer::new(settings)?)
}

/// Read the store; a store that does not exist yet is an empty tree.
fn load(container: &ServiceContainer) -> CliResult<()> {
    match container.persistor().read(container.preferences()) {
        Ok(()) => Ok(()),
        Err(e) if e.is_not_found() => {
            debug!("{e}");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn store(container: &ServiceContainer) -> CliResult<()> {
    container.persistor().write(container.preferences())?;
    Ok(())
}

fn find_node(prefs: &Preferences, path: &str) -> CliResult<Arc<Node>> {
    if path.trim() == ROOT_PATH {
        return Ok(Arc::clone(prefs.root()));
    }
    prefs
        .find(path)?
        .ok_or_else(|| CliError::NotFound(format!("node {path}")))
}

fn holder(prefs: &Preferences, location: &PreferencePath) -> CliResult<Option<Arc<Node>>> {
    match &location.node {
        Some(path) => Ok(prefs.find(path)?),
        None => Ok(Some(Arc::clone(prefs.root()))),
    }
}

/// JSON literal if it parses as one, plain text otherwise.
fn parse_value(raw: &str) -> PrefValue {
    serde_json::from_str(raw)
        .ok()
        .and_then(from_json)
        .unwrap_or_else(|| PrefValue::Text(raw.to_string()))
}

#[instrument(skip(container))]
fn cmd_get(container: &ServiceContainer, path: &str) -> CliResult<()> {
    let location = PreferencePath::parse(path)?;
    let value = holder(container.preferences(), &location)?
        .and_then(|node| node.get(&location.key))
        .ok_or_else(|| CliError::NotFound(location.canonical()))?;
    output::info(&value);
    Ok(())
}

#[instrument(skip(container))]
fn cmd_set(container: &ServiceContainer, path: &str, raw: &str) -> CliResult<()> {
    let location = PreferencePath::parse(path)?;
    let prefs = container.preferences();
    let node = match &location.node {
        Some(node) => prefs.node(node)?,
        None => Arc::clone(prefs.root()),
    };
    let value = parse_value(raw);
    node.put(location.key.as_str(), value.clone());
    store(container)?;
    output::action("set", &format!("{} = {value}", location.canonical()));
    Ok(())
}

#[instrument(skip(container))]
fn cmd_unset(container: &ServiceContainer, path: &str) -> CliResult<()> {
    let location = PreferencePath::parse(path)?;
    holder(container.preferences(), &location)?
        .and_then(|node| node.remove(&location.key))
        .ok_or_else(|| CliError::NotFound(location.canonical()))?;
    store(container)?;
    output::action("removed", &location.canonical());
    Ok(())
}

#[instrument(skip(container))]
fn cmd_keys(container: &ServiceContainer, path: &str) -> CliResult<()> {
    let node = find_node(container.preferences(), path)?;
    for key in node.keys() {
        output::info(&key);
    }
    Ok(())
}

#[instrument(skip(container))]
fn cmd_tree(container: &ServiceContainer, path: &str, values: bool) -> CliResult<()> {
    let node = find_node(container.preferences(), path)?;
    output::info(&node_tree(&node, values));
    Ok(())
}

#[instrument(skip(container))]
fn cmd_rm(container: &ServiceContainer, path: &str) -> CliResult<()> {
    if path.trim() == ROOT_PATH {
        return Err(CliError::InvalidArgs("cannot remove the root node".into()));
    }
    let removed = container
        .preferences()
        .remove_node(path)?
        .ok_or_else(|| CliError::NotFound(format!("node {path}")))?;
    store(container)?;
    output::action("removed", removed.path());
    Ok(())
}

fn cmd_config(command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = Settings::load()?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Path => {
            output::header("Config file:");
            match global_config_path() {
                Some(path) if path.exists() => output::detail(&path.display()),
                Some(path) => output::detail(&format!("{} (not present)", path.display())),
                None => output::warning("no config directory on this platform"),
            }
            output::header("Backing store:");
            output::detail(&Settings::load()?.location.display());
        }
        ConfigCommands::Template => output::info(&Settings::template()),
    }
    Ok(())
}
