//! Session-scoped environment variables.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Environment variables applied to every child process at launch.
///
/// Keys are unique; values overlay the environment the session itself
/// inherited. The supervisor treats this as read-only input; mutation
/// happens only through the configuration surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionEnvironment {
    vars: BTreeMap<String, String>,
}

impl SessionEnvironment {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Remove a variable. Returns the previous value, if any.
    pub fn unset(&mut self, name: &str) -> Option<String> {
        self.vars.remove(name)
    }

    /// Look up a variable.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Iterate over all variables in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Whether the environment carries no variables.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl FromIterator<(String, String)> for SessionEnvironment {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_unset() {
        let mut env = SessionEnvironment::new();
        env.set("GTK_THEME", "Adwaita");
        assert_eq!(env.get("GTK_THEME"), Some("Adwaita"));

        env.set("GTK_THEME", "Breeze");
        assert_eq!(env.get("GTK_THEME"), Some("Breeze"));
        assert_eq!(env.len(), 1);

        assert_eq!(env.unset("GTK_THEME"), Some("Breeze".to_string()));
        assert!(env.is_empty());
    }

    #[test]
    fn test_serde_is_a_plain_map() {
        let mut env = SessionEnvironment::new();
        env.set("LANG", "en_US.UTF-8");
        let json = serde_json::to_string(&env).unwrap();
        assert_eq!(json, r#"{"LANG":"en_US.UTF-8"}"#);

        let back: SessionEnvironment = serde_json::from_str(&json).unwrap();
        assert_eq!(env, back);
    }

    #[test]
    fn test_iter_is_name_ordered() {
        let mut env = SessionEnvironment::new();
        env.set("B", "2");
        env.set("A", "1");
        let names: Vec<&str> = env.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["A", "B"]);
    }
}
