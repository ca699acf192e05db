//! Window manager knowledge: the static registry and resolution policy.

pub mod registry;

pub use registry::{known_profiles, Resolution, WindowManagerRegistry};
