//! Session-wide orchestration: startup sequencing, shutdown, restart.

pub mod controller;

pub use controller::SessionController;
