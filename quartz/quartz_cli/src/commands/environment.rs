//! Session environment variable commands.

use std::path::Path;

use clap::Subcommand;

use super::open_store;

#[derive(Subcommand)]
pub enum EnvCommand {
    /// List session environment variables
    List,

    /// Set a variable for every session child process
    Set { name: String, value: String },

    /// Remove a variable
    Unset { name: String },
}

pub async fn execute(command: EnvCommand, config: Option<&Path>) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    match command {
        EnvCommand::List => {
            for (name, value) in store.profile().await.environment.iter() {
                println!("{name}={value}");
            }
        }
        EnvCommand::Set { name, value } => {
            store.set_variable(&name, &value).await?;
            println!("Set {name}");
        }
        EnvCommand::Unset { name } => {
            store.unset_variable(&name).await?;
            println!("Unset {name}");
        }
    }
    Ok(())
}
