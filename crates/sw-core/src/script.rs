//! Migration script type

use crate::script_name::ScriptName;

/// A named unit of SQL text that is executed at most once per database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    /// Script name, the identity recorded in the journal
    pub name: ScriptName,

    /// Raw script text, before preprocessing and splitting
    pub contents: String,
}

impl Script {
    /// Create a new script
    pub fn new(name: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            name: ScriptName::new(name),
            contents: contents.into(),
        }
    }
}

/// Sort scripts into execution order (ascending by name).
pub fn sort_scripts(scripts: &mut [Script]) {
    scripts.sort_by(|a, b| a.name.cmp(&b.name));
}
