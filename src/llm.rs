use anyhow::Context;
use clap::{Args, ValueEnum};
use genai::{
    adapter::AdapterKind,
    chat::{ChatMessage, ChatOptions, ChatRequest},
    resolver::Endpoint,
};

/// Default endpoint for the `gateway` provider (OpenAI-compatible AI gateway)
pub const DEFAULT_GATEWAY_URL: &str = "https://ai.gateway.lovable.dev/v1";

/// Environment variable holding the gateway API key
pub const GATEWAY_API_KEY_ENV: &str = "AI_GATEWAY_API_KEY";

/// LLM provider type; subset of AdapterKind in genai crate, plus an
/// OpenAI-compatible hosted gateway
#[derive(Clone, Debug, ValueEnum)]
pub enum Provider {
    /// OpenAI-compatible AI gateway with a dedicated endpoint and API key
    #[value(name = "gateway")]
    Gateway,

    /// For OpenAI Chat Completions and also OpenAI compatible APIs
    OpenAI,
    /// Gemini adapter supports gemini native protocol
    Gemini,
    /// Anthropic native protocol as well
    Anthropic,
    /// Reuses most of the OpenAI adapter behavior
    Groq,
    /// For DeepSeek (Mostly use OpenAI)
    DeepSeek,
    /// OpenAI shared behavior, localhost by default, no API key required
    Ollama,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Gateway => "gateway",
            Provider::OpenAI => "openai",
            Provider::Gemini => "gemini",
            Provider::Anthropic => "anthropic",
            Provider::Groq => "groq",
            Provider::DeepSeek => "deepseek",
            Provider::Ollama => "ollama",
        }
    }
}

/// Options to construct LLM client
#[derive(Clone, Debug, Args)]
pub struct LLMConstructionOptions {
    #[arg(
        long = "provider",
        help = "LLM service provider",
        long_help = r#"LLM service provider.

API keys are resolved from environment variables according to genai conventions.
- If --provider is specified: use the default environment variable for that adapter
- If omitted: infer the adapter from the model name and use its default environment variable
  - If this fails, try specifying --provider explicitly.

Default environment variables (genai crate):
  - OpenAI: OPENAI_API_KEY
  - Anthropic: ANTHROPIC_API_KEY
  - Gemini: GEMINI_API_KEY
  - Groq: GROQ_API_KEY
  - DeepSeek: DEEPSEEK_API_KEY
  - Ollama: (no API key required)

For the gateway provider, notepilot uses the endpoint given by --gateway-url
and reads a dedicated environment variable:
  - Gateway: AI_GATEWAY_API_KEY"#
    )]
    pub provider: Option<Provider>,

    #[arg(
        long = "gateway-url",
        default_value = DEFAULT_GATEWAY_URL,
        help = "Endpoint for the gateway provider (only used with --provider gateway)"
    )]
    pub gateway_url: String,
}

/// Create LLM client from construction options
pub fn create_llm_client(opts: &LLMConstructionOptions) -> anyhow::Result<genai::Client> {
    let opts = opts.clone();
    Ok(genai::Client::builder()
        .with_service_target_resolver_fn(move |mut target: genai::ServiceTarget| {
            if let Some(Provider::Gateway) = &opts.provider {
                target.endpoint = Endpoint::from_owned(opts.gateway_url.clone());
                target.auth = genai::resolver::AuthData::FromEnv(GATEWAY_API_KEY_ENV.to_string());
            }
            Ok(target)
        })
        .build())
}

/// Options for LLM requests
#[derive(Clone, Debug, Args)]
pub struct LLMRequestOptions {
    #[arg(
        long = "model",
        default_value = "gemini-2.5-flash",
        help = "LLM model identifier (e.g., gemini-2.5-flash)"
    )]
    pub model: String,
}

/// Sampling settings for one chat request
#[derive(Clone, Copy, Debug)]
pub struct ChatSettings {
    pub temperature: f64,
    pub max_tokens: u32,
}

/// Profile for the main study pack request
pub const PACK_CHAT_SETTINGS: ChatSettings = ChatSettings {
    temperature: 0.7,
    max_tokens: 12_000,
};

/// Profile for the fallback important-questions request
pub const QUESTIONS_CHAT_SETTINGS: ChatSettings = ChatSettings {
    temperature: 0.6,
    max_tokens: 2_500,
};

/// Infer provider from model name via genai adapter mapping.
pub fn infer_adapter_kind(model: &str) -> anyhow::Result<AdapterKind> {
    AdapterKind::from_model(model)
        .with_context(|| format!("failed to infer provider from model '{model}'"))
}

/// Execute LLM chat request and return the first text response
pub async fn chat_request(
    client: &genai::Client,
    opts: &LLMRequestOptions,
    settings: &ChatSettings,
    messages: Vec<ChatMessage>,
) -> anyhow::Result<String> {
    let chat_options = ChatOptions::default()
        .with_temperature(settings.temperature)
        .with_max_tokens(settings.max_tokens);

    let chat_resp = client
        .exec_chat(&opts.model, ChatRequest::new(messages), Some(&chat_options))
        .await
        .with_context(|| format!("failed to execute chat request (model: {})", opts.model))?;

    chat_resp
        .first_text()
        .map(|s| s.to_string())
        .context("LLM returned no text")
}
