//! Session configuration: the profile format and the on-disk store.

pub mod store;

pub use store::{default_profile_path, ModuleStore, SessionProfile};
