use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Resolved variables, name to value.
pub type Variables = HashMap<String, String>;

/// A single stored variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
  pub key: String,
  #[serde(default)]
  pub value: String,
  #[serde(default = "default_enabled")]
  pub enabled: bool,
}

fn default_enabled() -> bool {
  true
}

/// On-disk form of an environment or the globals file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariableFile {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default)]
  pub variables: Vec<Variable>,
}

impl VariableFile {
  /// Flatten to a map, skipping disabled entries. Later duplicates win.
  pub fn enabled(&self) -> Variables {
    self
      .variables
      .iter()
      .filter(|variable| variable.enabled)
      .map(|variable| (variable.key.clone(), variable.value.clone()))
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_disabled_variables_are_dropped() {
    let file: VariableFile = serde_json::from_str(
      r#"{
        "name": "dev",
        "variables": [
          { "key": "host", "value": "localhost" },
          { "key": "token", "value": "secret", "enabled": false },
          { "key": "port", "value": "8080", "enabled": true }
        ]
      }"#,
    )
    .unwrap();

    let vars = file.enabled();
    assert_eq!(vars.len(), 2);
    assert_eq!(vars["host"], "localhost");
    assert_eq!(vars["port"], "8080");
    assert!(!vars.contains_key("token"));
  }

  #[test]
  fn test_empty_file() {
    let file: VariableFile = serde_json::from_str("{}").unwrap();
    assert!(file.enabled().is_empty());
  }
}
