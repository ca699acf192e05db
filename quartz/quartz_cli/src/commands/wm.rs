//! Window manager inspection commands.

use clap::Subcommand;

use quartz_session::wm::WindowManagerRegistry;

#[derive(Subcommand)]
pub enum WmCommand {
    /// List known window managers and whether they are installed
    List,
}

pub fn execute(command: WmCommand) -> anyhow::Result<()> {
    match command {
        WmCommand::List => list(),
    }
}

fn list() -> anyhow::Result<()> {
    let registry = WindowManagerRegistry::new();
    let installed = registry.detect_installed();

    for profile in registry.profiles() {
        let marker = if installed.iter().any(|p| p.identifier == profile.identifier) {
            "installed"
        } else {
            "not found"
        };
        println!("{:<12} {:<10} {}", profile.identifier, marker, profile.display_description);
    }

    match installed.first() {
        Some(first) => println!("\nDefault suggestion: {}", first.identifier),
        None => println!("\nNo usable window manager found."),
    }
    Ok(())
}
