//! Model catalogue and capability gating.
//!
//! The catalogue is a static allow-list of models the UI offers. Capability
//! gating only applies to catalogued models; an unknown model id is routed
//! to the default provider permissively so power users can reach models the
//! UI has not caught up with yet.

use serde::{Deserialize, Serialize};

/// Model used for background title generation.
pub const TITLE_MODEL: &str = "google/gemini-flash-1.5";

/// Input capability a model advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    /// Image inputs by URL.
    Image,
    /// Raw document inputs (PDF, plain text).
    Document,
    /// Audio inputs.
    Audio,
    /// Video inputs.
    Video,
    /// Code-aware inputs.
    Code,
}

/// Upstream provider a model is served through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// OpenRouter aggregation API.
    OpenRouter,
    /// Google Generative Language API, used directly for `google/` models
    /// when the caller supplies a Google credential.
    Google,
}

/// One catalogue entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelEntry {
    /// Provider-qualified model id.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Vendor name.
    pub company: &'static str,
    /// Input capabilities beyond plain text.
    pub supports: &'static [Capability],
}

const MODELS: &[ModelEntry] = &[
    ModelEntry {
        id: "meta-llama/llama-3.1-405b-instruct",
        name: "LLaMA 3.1",
        company: "Meta",
        supports: &[],
    },
    ModelEntry {
        id: "meta-llama/llama-4-maverick",
        name: "LLaMA 4 Maverick",
        company: "Meta",
        supports: &[],
    },
    ModelEntry {
        id: "mistralai/devstral-small",
        name: "DevStral Small",
        company: "Mistral AI",
        supports: &[],
    },
    ModelEntry {
        id: "mistralai/mistral-7b-instruct-v0.2",
        name: "Mistral 7B Instruct v0.2",
        company: "Mistral AI",
        supports: &[Capability::Document],
    },
    ModelEntry {
        id: "mistralai/mixtral-8x22b",
        name: "Mixtral 8x22B",
        company: "Mistral AI",
        supports: &[Capability::Document],
    },
    ModelEntry {
        id: "deepseek/deepseek-r1-0528:free",
        name: "DeepSeek R1",
        company: "DeepSeek",
        supports: &[Capability::Image],
    },
    ModelEntry {
        id: "deepseek/deepseek-r1-0528-qwen3-8b:free",
        name: "DeepSeek Qwen 8B",
        company: "DeepSeek",
        supports: &[Capability::Image, Capability::Document],
    },
    ModelEntry {
        id: "sarvamai/sarvam-m",
        name: "Sarvam M",
        company: "SarvamAI",
        supports: &[Capability::Document],
    },
    ModelEntry {
        id: "opengvlab/internvl3-14b:free",
        name: "InternVL3 14B",
        company: "OpenGVLab",
        supports: &[Capability::Document],
    },
    ModelEntry {
        id: "google/gemini-2.5-flash-preview-05-20",
        name: "Gemini 2.5 Flash (Preview)",
        company: "Google",
        supports: &[Capability::Document],
    },
    ModelEntry {
        id: "google/gemini-1.5-pro",
        name: "Gemini 1.5 Pro",
        company: "Google",
        supports: &[Capability::Image, Capability::Document, Capability::Code],
    },
    ModelEntry {
        id: "anthropic/claude-3-opus-20240229",
        name: "Claude 3 Opus",
        company: "Anthropic",
        supports: &[Capability::Image, Capability::Document],
    },
    ModelEntry {
        id: "anthropic/claude-3-sonnet-20240229",
        name: "Claude 3 Sonnet",
        company: "Anthropic",
        supports: &[Capability::Image, Capability::Document],
    },
    ModelEntry {
        id: "openai/o3-mini-2025-01-31",
        name: "o3 Mini",
        company: "OpenAI",
        supports: &[Capability::Document],
    },
    ModelEntry {
        id: "openai/gpt-4.1-2025-04-14",
        name: "GPT-4.1",
        company: "OpenAI",
        supports: &[Capability::Document],
    },
    ModelEntry {
        id: "openai/gpt-4o",
        name: "GPT-4o",
        company: "OpenAI",
        supports: &[
            Capability::Image,
            Capability::Audio,
            Capability::Video,
            Capability::Document,
            Capability::Code,
        ],
    },
];

/// Static model catalogue.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelCatalog;

impl ModelCatalog {
    /// Every catalogued model, in display order.
    pub fn entries(&self) -> &'static [ModelEntry] {
        MODELS
    }

    /// Look up a catalogued model by id.
    pub fn find(&self, model_id: &str) -> Option<&'static ModelEntry> {
        MODELS.iter().find(|entry| entry.id == model_id)
    }

    /// Whether a model accepts the given capability.
    ///
    /// Unknown models are treated as accepting everything; the upstream
    /// provider is the authority for models outside the catalogue.
    pub fn supports(&self, model_id: &str, capability: Capability) -> bool {
        match self.find(model_id) {
            Some(entry) => entry.supports.contains(&capability),
            None => true,
        }
    }

    /// Provider a model id routes to.
    pub fn provider_for(&self, model_id: &str, has_google_credential: bool) -> Provider {
        if has_google_credential && model_id.starts_with("google/") {
            Provider::Google
        } else {
            Provider::OpenRouter
        }
    }
}
