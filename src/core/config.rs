//! Pipeline configuration from YAML

use crate::core::{
    decoder::{DecodeTarget, Decoder, PassthroughDecoder, RegexDecoder, StructuredDecoder},
    pipeline::Pipeline,
    step::Step,
    template::{is_referenceable_name, PromptTemplate},
};
use crate::llm::{CommandBackend, LlmBackend, LlmClientConfig, LlmMode, MockBackend, OpenAiBackend};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Environment variable consulted for the API key when none is configured
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Variable definition - a literal string or the contents of a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableDefinition {
    /// Simple string value
    String(String),
    /// File whose contents become the value
    File { path: String },
}

impl VariableDefinition {
    /// Produce the value bound into templates
    pub fn resolve(&self) -> Result<String> {
        match self {
            VariableDefinition::String(s) => Ok(s.clone()),
            VariableDefinition::File { path } => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read variable file: {}", path)),
        }
    }
}

/// Top-level pipeline configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline name
    pub name: String,

    /// Pipeline version (optional)
    #[serde(default)]
    pub version: Option<String>,

    /// Backend shared by every step without its own
    #[serde(default)]
    pub backend: BackendConfig,

    /// Variables bound into every step's template (step bindings win)
    #[serde(default)]
    pub variables: IndexMap<String, Value>,

    /// Pipeline steps, in execution order
    pub steps: Vec<StepConfig>,
}

/// Step configuration as defined in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    /// Unique step name, also its memory key
    pub name: String,

    /// Optional step description
    #[serde(default)]
    pub description: Option<String>,

    /// The prompt template for this step
    pub prompt: String,

    /// Invocation mode passed to the backend
    #[serde(default)]
    pub mode: LlmMode,

    /// Step-local template bindings
    #[serde(default)]
    pub bindings: IndexMap<String, String>,

    /// Output decoder
    #[serde(default)]
    pub decoder: DecoderConfig,

    /// Destination shape for the decoder
    #[serde(default)]
    pub target: DecodeTarget,

    /// Backend override for this step
    #[serde(default)]
    pub backend: Option<BackendConfig>,
}

/// Decoder selection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DecoderConfig {
    /// Raw text unchanged
    #[default]
    Passthrough,
    /// JSON document bound onto the target
    Json,
    /// YAML document bound onto the target
    Yaml,
    /// First match of a capture pattern
    Regex { pattern: String },
}

impl DecoderConfig {
    /// Build the decoder; a regex without capture groups is rejected here
    pub fn build(&self) -> Result<Arc<dyn Decoder>> {
        let decoder: Arc<dyn Decoder> = match self {
            DecoderConfig::Passthrough => Arc::new(PassthroughDecoder),
            DecoderConfig::Json => Arc::new(StructuredDecoder::json()),
            DecoderConfig::Yaml => Arc::new(StructuredDecoder::yaml()),
            DecoderConfig::Regex { pattern } => Arc::new(RegexDecoder::new(pattern)?),
        };
        Ok(decoder)
    }
}

/// Backend selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    /// OpenAI-compatible HTTP API
    Openai {
        #[serde(default)]
        model: Option<String>,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default)]
        max_tokens: Option<u32>,
        #[serde(default)]
        stop: Vec<String>,
        /// Name of the environment variable holding the API key
        #[serde(default)]
        api_key_env: Option<String>,
        #[serde(default)]
        timeout_secs: Option<u64>,
    },
    /// Local program receiving the prompt as its last argument
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        mode_flag: Option<String>,
        #[serde(default)]
        timeout_secs: Option<u64>,
    },
    /// Canned responses, in order
    Mock { responses: Vec<String> },
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Openai {
            model: None,
            base_url: None,
            temperature: None,
            max_tokens: None,
            stop: Vec::new(),
            api_key_env: None,
            timeout_secs: None,
        }
    }
}

impl BackendConfig {
    /// Client settings for the `openai` backend, `None` for the others
    ///
    /// `lookup_secret` maps a secret name (the configured `api_key_env`) to its
    /// value; the caller decides where secrets come from.
    pub fn client_config<F>(&self, lookup_secret: F) -> Option<LlmClientConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let BackendConfig::Openai {
            model,
            base_url,
            temperature,
            max_tokens,
            stop,
            api_key_env,
            timeout_secs,
        } = self
        else {
            return None;
        };

        let defaults = LlmClientConfig::default();
        let key_name = api_key_env.as_deref().unwrap_or(DEFAULT_API_KEY_ENV);
        let config = LlmClientConfig {
            base_url: base_url.clone().unwrap_or(defaults.base_url),
            api_key: lookup_secret(key_name),
            model: model.clone().unwrap_or(defaults.model),
            temperature: temperature.unwrap_or(defaults.temperature),
            max_tokens: max_tokens.unwrap_or(defaults.max_tokens),
            stop: stop.clone(),
            timeout_secs: timeout_secs.unwrap_or(defaults.timeout_secs),
        };
        if config.api_key.is_none() {
            warn!("No API key found in {}; requests are sent unauthenticated", key_name);
        }
        Some(config)
    }

    /// Build the backend, looking up its API key through `lookup_secret`
    pub fn build<F>(&self, lookup_secret: F) -> Result<Arc<dyn LlmBackend>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend: Arc<dyn LlmBackend> = match self {
            BackendConfig::Openai { .. } => {
                let config = self
                    .client_config(lookup_secret)
                    .context("Missing client settings for the openai backend")?;
                Arc::new(OpenAiBackend::new(config).context("Failed to build HTTP client")?)
            }
            BackendConfig::Command {
                program,
                args,
                mode_flag,
                timeout_secs,
            } => {
                let mut backend = CommandBackend::new(
                    program.clone(),
                    timeout_secs.unwrap_or(LlmClientConfig::default().timeout_secs),
                )
                .with_args(args.clone());
                if let Some(flag) = mode_flag {
                    backend = backend.with_mode_flag(flag.clone());
                }
                Arc::new(backend)
            }
            BackendConfig::Mock { responses } => Arc::new(MockBackend::new(responses.clone())),
        };
        Ok(backend)
    }
}

impl PipelineConfig {
    /// Load pipeline configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse pipeline configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the pipeline configuration
    pub fn validate(&self) -> Result<()> {
        if self.steps.is_empty() {
            anyhow::bail!("Pipeline '{}' has no steps", self.name);
        }

        let mut seen = HashSet::new();
        for step in &self.steps {
            if step.name.trim().is_empty() {
                anyhow::bail!("Step names must not be empty");
            }
            if !is_referenceable_name(&step.name) {
                anyhow::bail!(
                    "Step name '{}' may only contain letters, digits, '_' and '-'",
                    step.name
                );
            }

            let template = PromptTemplate::new(step.prompt.as_str())
                .with_context(|| format!("Step '{}' has an invalid prompt", step.name))?;

            step.decoder
                .build()
                .with_context(|| format!("Step '{}' has an invalid decoder", step.name))?;

            if step.decoder == DecoderConfig::Passthrough && step.target != DecodeTarget::Scalar {
                anyhow::bail!(
                    "Step '{}' uses the passthrough decoder, which only fills a scalar target",
                    step.name
                );
            }

            // Later steps resolve as missing at run time; flag them early
            for reference in template.references() {
                if let Some((target, _)) = reference.split_once('.') {
                    if !seen.contains(target) {
                        warn!(
                            "Step '{}' references '{}' which does not run before it",
                            step.name, reference
                        );
                    }
                }
            }

            if !seen.insert(step.name.as_str()) {
                anyhow::bail!("Duplicate step name: {}", step.name);
            }
        }

        for (var_name, var_def) in self.get_variables() {
            if let VariableDefinition::File { path } = &var_def {
                if !Path::new(path).exists() {
                    anyhow::bail!(
                        "Variable '{}' references file that doesn't exist: {}",
                        var_name,
                        path
                    );
                }
            }
        }

        Ok(())
    }

    /// Get variables as parsed VariableDefinition enum
    pub fn get_variables(&self) -> IndexMap<String, VariableDefinition> {
        let mut vars = IndexMap::new();

        for (key, value) in &self.variables {
            let var_def = match value {
                Value::String(s) => VariableDefinition::String(s.clone()),
                Value::Mapping(map) => {
                    // File variable: { path: "..." }
                    let path = map
                        .get(Value::String("path".to_string()))
                        .and_then(|v| v.as_str())
                        .unwrap_or("")
                        .to_string();
                    VariableDefinition::File { path }
                }
                Value::Number(n) => VariableDefinition::String(n.to_string()),
                Value::Bool(b) => VariableDefinition::String(b.to_string()),
                _ => VariableDefinition::String(
                    serde_yaml::to_string(value).unwrap_or_default().trim_end().to_string(),
                ),
            };
            vars.insert(key.clone(), var_def);
        }

        vars
    }

    /// Resolve every variable to the string bound into templates
    pub fn resolve_variables(&self) -> Result<IndexMap<String, String>> {
        self.get_variables()
            .into_iter()
            .map(|(name, def)| Ok((name, def.resolve()?)))
            .collect()
    }

    /// Build the pipeline, constructing backends from the configuration
    pub fn to_pipeline<F>(&self, lookup_secret: F) -> Result<Pipeline>
    where
        F: Fn(&str) -> Option<String>,
    {
        // The pipeline-level backend is only built when some step uses it
        let shared = if self.steps.iter().any(|step| step.backend.is_none()) {
            Some(self.backend.build(&lookup_secret)?)
        } else {
            None
        };

        self.assemble(|step| match (&step.backend, &shared) {
            (Some(config), _) => config.build(&lookup_secret),
            (None, Some(shared)) => Ok(shared.clone()),
            (None, None) => anyhow::bail!("Step '{}' has no backend", step.name),
        })
    }

    /// Build the pipeline with one backend for every step, ignoring backend config
    pub fn to_pipeline_with_backend(&self, backend: Arc<dyn LlmBackend>) -> Result<Pipeline> {
        self.assemble(|_| Ok(backend.clone()))
    }

    fn assemble<F>(&self, backend_for: F) -> Result<Pipeline>
    where
        F: Fn(&StepConfig) -> Result<Arc<dyn LlmBackend>>,
    {
        let variables = self.resolve_variables()?;

        let steps = self
            .steps
            .iter()
            .map(|config| {
                let prompt = PromptTemplate::new(config.prompt.as_str())?
                    .with_bindings(config.bindings.clone())
                    .with_default_bindings(variables.clone());
                let step = Step::new(
                    config.name.clone(),
                    backend_for(config)?,
                    config.mode,
                    prompt,
                    config.decoder.build()?,
                    config.target.clone(),
                )?;
                Ok(step)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Pipeline::new(self.name.clone(), steps)?)
    }
}
