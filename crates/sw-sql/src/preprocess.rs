//! Script text transformations applied before splitting and execution

use crate::error::{SqlError, SqlResult};
use regex::{NoExpand, Regex};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Name reserved for the schema token; never treated as a user variable.
pub const SCHEMA_TOKEN: &str = "schema";

/// A pure text transformation over script contents
pub trait ScriptPreprocessor: Send + Sync {
    /// Transform the script text
    fn process(&self, contents: &str) -> SqlResult<String>;
}

fn schema_with_dot_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\$schema\$\.?").expect("valid regex"))
}

fn schema_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\$schema\$").expect("valid regex"))
}

fn variable_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$(\w+)\$").expect("valid regex"))
}

/// Replaces `$schema$` with the quoted schema, or removes it (and a
/// following `.`) when no schema is configured.
#[derive(Debug, Clone)]
pub struct SchemaTokenPreprocessor {
    qualifier: Option<String>,
}

impl SchemaTokenPreprocessor {
    /// `qualifier` is the already-quoted schema text, see `SqlDialect::schema_qualifier`
    pub fn new(qualifier: Option<String>) -> Self {
        Self { qualifier }
    }
}

impl ScriptPreprocessor for SchemaTokenPreprocessor {
    fn process(&self, contents: &str) -> SqlResult<String> {
        let processed = match &self.qualifier {
            Some(qualifier) => schema_regex().replace_all(contents, NoExpand(qualifier)),
            None => schema_with_dot_regex().replace_all(contents, ""),
        };
        Ok(processed.into_owned())
    }
}

/// Replaces `$name$` tokens with values from a variable map.
///
/// Every token must have a value; the first one without is reported.
/// `$schema$` is left for [`SchemaTokenPreprocessor`].
#[derive(Debug, Clone)]
pub struct VariableSubstitutionPreprocessor<'a> {
    variables: &'a HashMap<String, String>,
}

impl<'a> VariableSubstitutionPreprocessor<'a> {
    /// Create a preprocessor over the given variables
    pub fn new(variables: &'a HashMap<String, String>) -> Self {
        Self { variables }
    }
}

impl ScriptPreprocessor for VariableSubstitutionPreprocessor<'_> {
    fn process(&self, contents: &str) -> SqlResult<String> {
        let mut output = String::with_capacity(contents.len());
        let mut last = 0;

        for caps in variable_regex().captures_iter(contents) {
            let (whole, name) = match (caps.get(0), caps.get(1)) {
                (Some(whole), Some(name)) => (whole, name.as_str()),
                _ => continue,
            };
            let value = match self.variables.get(name) {
                Some(value) => value.as_str(),
                None if name.eq_ignore_ascii_case(SCHEMA_TOKEN) => continue,
                None => {
                    return Err(SqlError::UndefinedVariable {
                        name: name.to_string(),
                    })
                }
            };
            output.push_str(&contents[last..whole.start()]);
            output.push_str(value);
            last = whole.end();
        }

        output.push_str(&contents[last..]);
        Ok(output)
    }
}

/// Run preprocessors in order, feeding each the previous output
pub fn apply_preprocessors(
    contents: &str,
    preprocessors: &[&dyn ScriptPreprocessor],
) -> SqlResult<String> {
    let mut text = contents.to_string();
    for preprocessor in preprocessors {
        text = preprocessor.process(&text)?;
    }
    Ok(text)
}

#[cfg(test)]
#[path = "preprocess_test.rs"]
mod tests;
