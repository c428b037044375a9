//! Shared memory store - step results keyed by step name

use crate::core::decoder::Decoded;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field holding the raw model text in every entry
pub const OUTPUT_FIELD: &str = "output";

/// Field holding a decoded scalar
pub const VALUE_FIELD: &str = "value";

/// Field holding a decoded sequence
pub const VALUES_FIELD: &str = "values";

/// The stored result of one step
///
/// An ordered field map: `output` first, then any decoded fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryEntry {
    fields: IndexMap<String, Value>,
}

impl MemoryEntry {
    /// Entry holding only the raw output
    pub fn new(output: impl Into<String>) -> Self {
        let mut fields = IndexMap::new();
        fields.insert(OUTPUT_FIELD.to_string(), Value::String(output.into()));
        Self { fields }
    }

    /// Entry for a decoded step result
    ///
    /// Record fields are flattened next to `output`, a scalar is stored under
    /// `value` and a sequence under `values`. A decoded field named `output`
    /// never replaces the raw text.
    pub fn from_decoded(raw: &str, decoded: &Decoded) -> Self {
        let mut entry = Self::new(raw);
        match decoded {
            Decoded::Text(text) => {
                entry
                    .fields
                    .insert(VALUE_FIELD.to_string(), Value::String(text.clone()));
            }
            Decoded::Record(record) => {
                for (name, value) in record {
                    if name != OUTPUT_FIELD {
                        entry.fields.insert(name.clone(), value.clone());
                    }
                }
            }
            Decoded::Sequence(items) => {
                entry.fields.insert(
                    VALUES_FIELD.to_string(),
                    Value::Array(items.iter().cloned().map(Value::String).collect()),
                );
            }
        }
        entry
    }

    /// Entry from arbitrary fields, used for the pipeline's initial input
    pub fn from_fields(fields: IndexMap<String, Value>) -> Self {
        Self { fields }
    }

    /// The raw text the step produced
    pub fn output(&self) -> Option<&str> {
        self.fields.get(OUTPUT_FIELD).and_then(Value::as_str)
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Follow a dotted path: the first segment names a field, the rest index
    /// into nested objects (or arrays, by position)
    pub fn lookup<'a, I>(&self, path: I) -> Option<&Value>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut segments = path.into_iter();
        let mut current = self.fields.get(segments.next()?)?;
        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn fields(&self) -> &IndexMap<String, Value> {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Contract every memory backend implements
///
/// Writes cannot fail and reads never error on a missing key.
pub trait Memory: Send + Sync {
    /// Store or overwrite the entry under `key`
    fn put(&mut self, key: &str, entry: MemoryEntry);

    /// Get the entry under `key`, if any
    fn get(&self, key: &str) -> Option<MemoryEntry>;

    /// Snapshot of every entry
    fn all(&self) -> IndexMap<String, MemoryEntry>;

    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    fn len(&self) -> usize {
        self.all().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Human-readable dump of the whole store
    fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.all())
    }
}

/// In-process memory backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RamMemory {
    entries: IndexMap<String, MemoryEntry>,
}

impl RamMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store from a previous dump, e.g. to continue across runs
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Memory for RamMemory {
    fn put(&mut self, key: &str, entry: MemoryEntry) {
        self.entries.insert(key.to_string(), entry);
    }

    fn get(&self, key: &str) -> Option<MemoryEntry> {
        self.entries.get(key).cloned()
    }

    fn all(&self) -> IndexMap<String, MemoryEntry> {
        self.entries.clone()
    }

    fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
