use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Where a variable's value comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableKind {
    /// The literal `value`
    #[default]
    Value,
    /// A process environment variable named by `value` (or `name`)
    #[serde(alias = "env")]
    Environment,
    /// A key, or dotted path, in the current output scope
    Reference,
    /// A secret from the secret manager
    Secret,
    /// A secret that is also kept out of logs
    Protected,
}

impl VariableKind {
    pub fn is_secret(self) -> bool {
        matches!(self, VariableKind::Secret | VariableKind::Protected)
    }
}

impl fmt::Display for VariableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VariableKind::Value => "value",
            VariableKind::Environment => "environment",
            VariableKind::Reference => "reference",
            VariableKind::Secret => "secret",
            VariableKind::Protected => "protected",
        };
        f.write_str(name)
    }
}

/// One input of a component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDescriptor {
    /// Key the resolved value is stored under
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: VariableKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl VariableDescriptor {
    fn new(name: impl Into<String>, kind: VariableKind, value: Option<Value>) -> Self {
        Self {
            name: name.into(),
            kind,
            value,
            default: None,
        }
    }

    pub fn value(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(name, VariableKind::Value, Some(value.into()))
    }

    pub fn environment(name: impl Into<String>, variable: impl Into<String>) -> Self {
        Self::new(name, VariableKind::Environment, Some(Value::String(variable.into())))
    }

    pub fn reference(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self::new(name, VariableKind::Reference, Some(Value::String(key.into())))
    }

    pub fn secret(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self::new(name, VariableKind::Secret, Some(Value::String(key.into())))
    }

    pub fn protected(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self::new(name, VariableKind::Protected, Some(Value::String(key.into())))
    }

    #[must_use]
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// The lookup key for non-literal kinds: `value` when it is a string, else `name`
    pub fn source_key(&self) -> Option<&str> {
        match &self.value {
            Some(Value::String(key)) => Some(key),
            None | Some(Value::Null) => Some(&self.name),
            Some(_) => None,
        }
    }
}
