//! Decoders - turn raw model text into the destination shape of a step

use crate::core::error::DecodeError;
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named field of a record destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,

    /// Used when the source has no such field; without one the field is required
    #[serde(default)]
    pub default: Option<Value>,
}

impl FieldSpec {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    pub fn with_default(name: impl Into<String>, default: Value) -> Self {
        Self {
            name: name.into(),
            default: Some(default),
        }
    }
}

/// Caller-described shape a decoder fills in
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DecodeTarget {
    /// Any single value
    #[default]
    Scalar,
    /// Named fields, matched case-sensitively
    Record { fields: Vec<FieldSpec> },
    /// Ordered list of strings
    Sequence,
}

impl DecodeTarget {
    /// Record destination whose fields are all required
    pub fn record<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DecodeTarget::Record {
            fields: names.into_iter().map(FieldSpec::required).collect(),
        }
    }

    /// Bind a source record onto the target fields
    fn bind_record<F>(fields: &[FieldSpec], mut source: F) -> Result<IndexMap<String, Value>, DecodeError>
    where
        F: FnMut(&str) -> Option<Value>,
    {
        let mut record = IndexMap::with_capacity(fields.len());
        for field in fields {
            let value = match source(&field.name) {
                Some(value) => value,
                None => field.default.clone().ok_or_else(|| {
                    DecodeError::SchemaMismatch(format!("missing required field '{}'", field.name))
                })?,
            };
            record.insert(field.name.clone(), value);
        }
        Ok(record)
    }
}

/// Decoded step result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Decoded {
    Text(String),
    Record(IndexMap<String, Value>),
    Sequence(Vec<String>),
}

impl Decoded {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Decoded::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Decoded::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[String]> {
        match self {
            Decoded::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Decoded::Text(text) => Value::String(text),
            Decoded::Record(record) => Value::Object(record.into_iter().collect()),
            Decoded::Sequence(items) => Value::Array(items.into_iter().map(Value::String).collect()),
        }
    }
}

/// Trait for output decoding strategies
pub trait Decoder: Send + Sync {
    /// Decode one raw model output into the target shape
    fn decode(&self, raw: &str, target: &DecodeTarget) -> Result<Decoded, DecodeError>;

    /// Strategy name used in logs and config
    fn name(&self) -> &'static str;
}

/// Hands the raw text through unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughDecoder;

impl Decoder for PassthroughDecoder {
    fn decode(&self, raw: &str, _target: &DecodeTarget) -> Result<Decoded, DecodeError> {
        Ok(Decoded::Text(raw.to_string()))
    }

    fn name(&self) -> &'static str {
        "passthrough"
    }
}

/// Self-describing text formats the structured decoder can parse
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructuredFormat {
    #[default]
    Json,
    /// Any prose is a valid YAML document (a plain string), so a bare string
    /// only satisfies a scalar target
    Yaml,
}

/// Parses the output as a structured document and binds it to the target
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredDecoder {
    format: StructuredFormat,
}

impl StructuredDecoder {
    pub fn new(format: StructuredFormat) -> Self {
        Self { format }
    }

    pub fn json() -> Self {
        Self::new(StructuredFormat::Json)
    }

    pub fn yaml() -> Self {
        Self::new(StructuredFormat::Yaml)
    }

    fn parse(&self, raw: &str) -> Result<Value, DecodeError> {
        match self.format {
            StructuredFormat::Json => {
                serde_json::from_str(raw.trim()).map_err(|e| DecodeError::Malformed(e.to_string()))
            }
            StructuredFormat::Yaml => {
                serde_yaml::from_str(raw).map_err(|e| DecodeError::Malformed(e.to_string()))
            }
        }
    }
}

/// Strings are taken verbatim, anything else as compact JSON
fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Decoder for StructuredDecoder {
    fn decode(&self, raw: &str, target: &DecodeTarget) -> Result<Decoded, DecodeError> {
        let parsed = self.parse(raw)?;

        if let (StructuredFormat::Yaml, Value::String(_)) = (self.format, &parsed) {
            if *target != DecodeTarget::Scalar {
                return Err(DecodeError::Malformed(
                    "output is plain text, not a YAML mapping or list".to_string(),
                ));
            }
        }

        match target {
            DecodeTarget::Scalar => Ok(Decoded::Text(value_to_text(&parsed))),
            DecodeTarget::Sequence => match parsed {
                Value::Array(items) => Ok(Decoded::Sequence(items.iter().map(value_to_text).collect())),
                other => Err(DecodeError::SchemaMismatch(format!(
                    "expected an array, found {}",
                    kind_of(&other)
                ))),
            },
            DecodeTarget::Record { fields } => match parsed {
                Value::Object(object) => {
                    let record = DecodeTarget::bind_record(fields, |name| object.get(name).cloned())?;
                    Ok(Decoded::Record(record))
                }
                other => Err(DecodeError::SchemaMismatch(format!(
                    "expected an object, found {}",
                    kind_of(&other)
                ))),
            },
        }
    }

    fn name(&self) -> &'static str {
        match self.format {
            StructuredFormat::Json => "json",
            StructuredFormat::Yaml => "yaml",
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Captures substrings of the first match of a fixed pattern
#[derive(Debug, Clone)]
pub struct RegexDecoder {
    regex: Regex,
}

impl RegexDecoder {
    /// Compile the pattern; it must carry at least one capture group
    pub fn new(pattern: &str) -> Result<Self, DecodeError> {
        let regex = Regex::new(pattern).map_err(|e| DecodeError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        // captures_len counts the implicit whole-match group
        if regex.captures_len() < 2 {
            return Err(DecodeError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: "pattern has no capture groups".to_string(),
            });
        }

        Ok(Self { regex })
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }
}

impl Decoder for RegexDecoder {
    fn decode(&self, raw: &str, target: &DecodeTarget) -> Result<Decoded, DecodeError> {
        let captures = self.regex.captures(raw).ok_or_else(|| DecodeError::NoMatch {
            pattern: self.regex.as_str().to_string(),
        })?;

        let group = |i: usize| captures.get(i).map(|m| m.as_str().to_string()).unwrap_or_default();

        match target {
            DecodeTarget::Sequence => Ok(Decoded::Sequence(
                (1..captures.len()).map(group).collect(),
            )),
            DecodeTarget::Scalar => Ok(Decoded::Text(group(1))),
            DecodeTarget::Record { fields } => {
                let record = DecodeTarget::bind_record(fields, |name| {
                    captures
                        .name(name)
                        .map(|m| Value::String(m.as_str().to_string()))
                })?;
                Ok(Decoded::Record(record))
            }
        }
    }

    fn name(&self) -> &'static str {
        "regex"
    }
}
