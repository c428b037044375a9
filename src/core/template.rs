//! Prompt templates - `{{ name }}` and `{{ step.field }}` references
//!
//! A template is parsed once at construction. Rendering resolves qualified
//! references against the memory store and unqualified ones against the
//! step-local bindings and the input piped into the step. A reference that
//! cannot be resolved is an error, never an empty string.

use crate::core::error::ResolveError;
use crate::core::memory::{Memory, MemoryEntry};
use indexmap::IndexMap;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Reference(Vec<String>),
}

/// A parsed prompt template plus its step-local bindings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    source: String,
    segments: Vec<Segment>,
    bindings: IndexMap<String, String>,
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

/// Whether a step name can be referenced as `{{ name.field }}`
///
/// Letters, digits, `_` and `-` only.
pub fn is_referenceable_name(name: &str) -> bool {
    is_valid_segment(name)
}

fn parse(source: &str) -> Result<Vec<Segment>, ResolveError> {
    let mut segments = Vec::new();
    let mut rest = source;

    while let Some(start) = rest.find("{{") {
        if start > 0 {
            segments.push(Segment::Literal(rest[..start].to_string()));
        }
        let after_open = &rest[start + 2..];
        let end = after_open.find("}}").ok_or_else(|| ResolveError::Malformed {
            reason: format!("unterminated '{{{{' at byte {}", source.len() - rest.len() + start),
        })?;

        let inner = after_open[..end].trim();
        let path: Vec<String> = inner.split('.').map(str::to_string).collect();
        if !path.iter().all(|s| is_valid_segment(s)) {
            return Err(ResolveError::Malformed {
                reason: format!("invalid reference '{{{{{}}}}}'", &after_open[..end]),
            });
        }
        segments.push(Segment::Reference(path));
        rest = &after_open[end + 2..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Literal(rest.to_string()));
    }
    Ok(segments)
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl PromptTemplate {
    /// Parse a template
    pub fn new(source: impl Into<String>) -> Result<Self, ResolveError> {
        let source = source.into();
        let segments = parse(&source)?;
        Ok(Self {
            source,
            segments,
            bindings: IndexMap::new(),
        })
    }

    /// Add step-local bindings; existing keys are replaced
    pub fn with_bindings<I, K, V>(mut self, bindings: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.bindings
            .extend(bindings.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn with_binding(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.with_bindings([(key.into(), value.into())])
    }

    /// Add bindings only for keys not already bound
    pub fn with_default_bindings<I, K, V>(mut self, bindings: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in bindings {
            self.bindings.entry(k.into()).or_insert_with(|| v.into());
        }
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn bindings(&self) -> &IndexMap<String, String> {
        &self.bindings
    }

    /// Every reference in the template, dotted, in order of appearance
    pub fn references(&self) -> Vec<String> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Reference(path) => Some(path.join(".")),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    /// Render the prompt
    ///
    /// `input` is the entry piped into this step: the pipeline's initial input
    /// for the first step, the previous step's entry afterwards.
    pub fn render(
        &self,
        input: Option<&MemoryEntry>,
        memory: &dyn Memory,
    ) -> Result<String, ResolveError> {
        let mut prompt = String::with_capacity(self.source.len());

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => prompt.push_str(text),
                Segment::Reference(path) => prompt.push_str(&self.resolve(path, input, memory)?),
            }
        }

        Ok(prompt)
    }

    fn resolve(
        &self,
        path: &[String],
        input: Option<&MemoryEntry>,
        memory: &dyn Memory,
    ) -> Result<String, ResolveError> {
        let missing = || ResolveError::MissingBinding {
            reference: path.join("."),
        };

        match path {
            [name] => {
                if let Some(value) = self.bindings.get(name) {
                    return Ok(value.clone());
                }
                input
                    .and_then(|entry| entry.field(name))
                    .map(render_value)
                    .ok_or_else(missing)
            }
            [step, fields @ ..] => {
                let entry = memory.get(step).ok_or_else(missing)?;
                entry
                    .lookup(fields.iter().map(String::as_str))
                    .map(render_value)
                    .ok_or_else(missing)
            }
            [] => Err(missing()),
        }
    }
}
