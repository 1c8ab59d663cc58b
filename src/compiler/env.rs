//! Variable environment for one compiler invocation.
//!
//! Seeded from the definition's bindings. A `store` (or a click with `var`)
//! binds its name to an opaque runtime marker: the value only exists when the
//! executor runs the script, so interpolation re-emits `{{name}}` for it.

use indexmap::IndexMap;
use serde::Serialize;

use crate::placeholder;
use crate::value::{Map, Value};

/// What a name resolves to at compile time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "origin", rename_all = "lowercase")]
pub enum Binding {
    /// Value from the `data` section.
    Data { value: Value },
    /// Produced at run time by the step at `position`.
    Stored { position: usize },
}

#[derive(Debug, Clone, Default)]
pub struct VariableEnv {
    bindings: IndexMap<String, Binding>,
}

impl VariableEnv {
    pub fn from_bindings(bindings: &Map) -> Self {
        let bindings = bindings
            .iter()
            .map(|(k, v)| (k.clone(), Binding::Data { value: v.clone() }))
            .collect();
        Self { bindings }
    }

    pub fn store(&mut self, name: &str, position: usize) {
        self.bindings
            .insert(name.to_string(), Binding::Stored { position });
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    /// Substitutes brace and (optionally) sigil placeholders. Unknown names
    /// and environment references are left as written.
    pub fn interpolate(&self, text: &str, sigils: bool) -> String {
        placeholder::substitute(text, sigils, |name| {
            self.bindings.get(name).map(|binding| match binding {
                Binding::Data { value } => value.to_text(),
                Binding::Stored { .. } => format!("{{{{{}}}}}", name),
            })
        })
    }

    pub fn into_table(self) -> IndexMap<String, Binding> {
        self.bindings
    }
}
