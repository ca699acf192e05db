//! Autostart module management commands.

use std::path::Path;

use clap::Subcommand;

use quartz_core::types::ModuleDescriptor;

use super::open_store;

#[derive(Subcommand)]
pub enum ModulesCommand {
    /// List autostart modules
    List,

    /// Add an autostart module
    Add {
        /// Unique module name
        name: String,

        /// Command line to run (quoted as one argument)
        command: String,
    },

    /// Remove an autostart module
    Remove { name: String },

    /// Enable a module at session start
    Enable { name: String },

    /// Keep a module from being started
    Disable { name: String },
}

pub async fn execute(command: ModulesCommand, config: Option<&Path>) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    match command {
        ModulesCommand::List => {
            for module in store.profile().await.modules {
                let flag = if module.enabled { "enabled " } else { "disabled" };
                println!("{flag}  {:<16} {}", module.name, module.command);
            }
        }
        ModulesCommand::Add { name, command } => {
            store
                .add_module(ModuleDescriptor::new(name.clone(), command))
                .await?;
            println!("Added module '{name}'");
        }
        ModulesCommand::Remove { name } => {
            store.remove_module(&name).await?;
            println!("Removed module '{name}'");
        }
        ModulesCommand::Enable { name } => {
            store.set_enabled(&name, true).await?;
            println!("Enabled module '{name}'");
        }
        ModulesCommand::Disable { name } => {
            store.set_enabled(&name, false).await?;
            println!("Disabled module '{name}'");
        }
    }
    Ok(())
}
