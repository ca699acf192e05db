//! Data structures used throughout the Quartz system.

mod environment;
mod module;
mod wm;

pub use environment::SessionEnvironment;
pub use module::{ModuleDescriptor, ModuleState, ModuleStatus};
pub use wm::{DefaultApplications, WindowManagerProfile};
