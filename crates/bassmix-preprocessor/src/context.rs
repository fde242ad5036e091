//! Preprocessing Context
//!
//! Macro definitions and virtual includes supplied to a preprocessor before
//! it processes a header. A context is built per run and never shared.

use std::collections::BTreeMap;

/// A macro definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDefinition {
    /// Macro name, optionally with a parameter list (`F(x)`)
    pub name: String,
    pub value: Option<String>,
}

impl MacroDefinition {
    /// Create a macro that is simply defined (value `1`)
    pub fn defined(name: &str) -> Self {
        Self {
            name: name.to_string(),
            value: Some("1".to_string()),
        }
    }

    /// Create a macro with a specific value
    pub fn with_value(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: Some(value.to_string()),
        }
    }

    /// Create an undefined macro (for -U flag)
    pub fn undefined(name: &str) -> Self {
        Self {
            name: name.to_string(),
            value: None,
        }
    }

    /// Name without any parameter list
    pub fn identifier(&self) -> &str {
        self.name
            .split_once('(')
            .map_or(self.name.as_str(), |(ident, _)| ident)
            .trim()
    }

    /// Convert to clang -D/-U argument
    pub fn to_clang_arg(&self) -> String {
        match &self.value {
            Some(v) => format!("-D{}={}", self.name, v),
            None => format!("-U{}", self.identifier()),
        }
    }

    /// Convert to a `#define`/`#undef` directive line
    pub fn to_directive(&self) -> String {
        match &self.value {
            Some(v) if v.is_empty() => format!("#define {}", self.name),
            Some(v) => format!("#define {} {}", self.name, v),
            None => format!("#undef {}", self.identifier()),
        }
    }
}

/// Macro bindings and virtual includes for one preprocessing run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreprocessContext {
    defines: Vec<MacroDefinition>,
    includes: BTreeMap<String, String>,
}

impl PreprocessContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a macro, replacing an earlier binding of the same name
    pub fn define(&mut self, name: &str, value: &str) -> &mut Self {
        self.set(MacroDefinition::with_value(name, value))
    }

    /// Force a macro to be undefined
    pub fn undefine(&mut self, name: &str) -> &mut Self {
        self.set(MacroDefinition::undefined(name))
    }

    /// Register a virtual include satisfying `#include "name"` and `#include <name>`
    pub fn add(&mut self, name: &str, body: &str) -> &mut Self {
        self.includes.insert(name.to_string(), body.to_string());
        self
    }

    fn set(&mut self, definition: MacroDefinition) -> &mut Self {
        self.defines
            .retain(|existing| existing.identifier() != definition.identifier());
        self.defines.push(definition);
        self
    }

    /// Whether the context binds `name` to a value
    pub fn is_defined(&self, name: &str) -> bool {
        self.defines
            .iter()
            .any(|d| d.identifier() == name && d.value.is_some())
    }

    /// Value bound to `name`, if any
    pub fn value(&self, name: &str) -> Option<&str> {
        self.defines
            .iter()
            .find(|d| d.identifier() == name)
            .and_then(|d| d.value.as_deref())
    }

    /// Macro definitions in insertion order
    pub fn macros(&self) -> &[MacroDefinition] {
        &self.defines
    }

    /// Body of a virtual include
    pub fn include(&self, name: &str) -> Option<&str> {
        self.includes.get(name).map(String::as_str)
    }

    /// Virtual includes sorted by name
    pub fn includes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.includes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
