//! The `start` command: run a session until it ends.

use std::path::Path;

use tracing::{error, info, warn};

use quartz_session::{Session, SessionEvent};

/// Start the session and block until the window manager dies, the session
/// shuts down, or the user interrupts us.
pub async fn start(config: Option<&Path>) -> anyhow::Result<()> {
    let session = Session::new(config).await?;
    let mut events = session.subscribe();

    session.start().await?;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    if let Some(message) = event.user_message() {
                        // Surfaced for notification daemons watching stderr.
                        eprintln!("{message}");
                    }
                    match event {
                        SessionEvent::WindowManagerExited => {
                            warn!("Window manager exited; ending session");
                            session.shutdown().await?;
                            break;
                        }
                        SessionEvent::SessionShutdown => break,
                        _ => {}
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Event stream lagged, {} events dropped", skipped);
                }
                Err(err) => {
                    error!("Event stream closed: {}", err);
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received; shutting the session down");
                session.shutdown().await?;
                break;
            }
        }
    }

    Ok(())
}
