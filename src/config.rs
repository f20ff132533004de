use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    pub rag: RagConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origin for the documentation site; "*" for development.
    pub cors_origin: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the model server (Ollama-compatible REST API).
    pub base_url: String,
    pub embedding_model: String,
    pub generation_model: String,
    /// Dimensionality of the embedding model's output.
    pub embedding_dimensions: usize,
    /// Per-call ceiling; calls exceeding it surface as a gateway timeout.
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RagConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Longest single text accepted by the embedding client.
    pub max_input_chars: usize,
    /// Texts per provider embedding call.
    pub max_batch_size: usize,
    /// Embedding cache capacity in entries.
    pub cache_capacity: usize,
    pub default_top_k: usize,
    pub max_top_k: usize,
    /// Results scoring below this are treated as out of scope.
    pub min_score: f32,
    /// Longest document accepted by /embed.
    pub max_document_chars: usize,
    /// Longest message accepted by /chat.
    pub max_message_chars: usize,
    /// Character budget for retrieved context in the generation prompt.
    pub context_char_budget: usize,
    /// History turns included in the generation prompt.
    pub max_history_turns: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        Ok(Config {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()?,
                cors_origin: env::var("CORS_ORIGIN").unwrap_or_else(|_| "*".to_string()),
            },
            provider: ProviderConfig {
                base_url: env::var("PROVIDER_URL")
                    .unwrap_or_else(|_| "http://localhost:11434".to_string()),
                embedding_model: env::var("EMBEDDING_MODEL")
                    .unwrap_or_else(|_| "nomic-embed-text".to_string()),
                generation_model: env::var("GENERATION_MODEL")
                    .unwrap_or_else(|_| "llama3.2".to_string()),
                embedding_dimensions: env::var("EMBEDDING_DIMENSIONS")
                    .unwrap_or_else(|_| "384".to_string())
                    .parse()?,
                timeout_ms: env::var("PROVIDER_TIMEOUT_MS")
                    .unwrap_or_else(|_| "10000".to_string())
                    .parse()?,
                max_retries: env::var("PROVIDER_MAX_RETRIES")
                    .unwrap_or_else(|_| "3".to_string())
                    .parse()?,
                retry_base_delay_ms: env::var("PROVIDER_RETRY_BASE_DELAY_MS")
                    .unwrap_or_else(|_| "100".to_string())
                    .parse()?,
            },
            rag: RagConfig {
                chunk_size: env::var("CHUNK_SIZE")
                    .unwrap_or_else(|_| "1000".to_string())
                    .parse()?,
                chunk_overlap: env::var("CHUNK_OVERLAP")
                    .unwrap_or_else(|_| "200".to_string())
                    .parse()?,
                max_input_chars: env::var("MAX_INPUT_CHARS")
                    .unwrap_or_else(|_| "8192".to_string())
                    .parse()?,
                max_batch_size: env::var("MAX_BATCH_SIZE")
                    .unwrap_or_else(|_| "32".to_string())
                    .parse()?,
                cache_capacity: env::var("CACHE_CAPACITY")
                    .unwrap_or_else(|_| "4096".to_string())
                    .parse()?,
                default_top_k: env::var("DEFAULT_TOP_K")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()?,
                max_top_k: env::var("MAX_TOP_K")
                    .unwrap_or_else(|_| "100".to_string())
                    .parse()?,
                min_score: env::var("MIN_SCORE")
                    .unwrap_or_else(|_| "0.5".to_string())
                    .parse()?,
                max_document_chars: env::var("MAX_DOCUMENT_CHARS")
                    .unwrap_or_else(|_| "10000".to_string())
                    .parse()?,
                max_message_chars: env::var("MAX_MESSAGE_CHARS")
                    .unwrap_or_else(|_| "1000".to_string())
                    .parse()?,
                context_char_budget: env::var("CONTEXT_CHAR_BUDGET")
                    .unwrap_or_else(|_| "6000".to_string())
                    .parse()?,
                max_history_turns: env::var("MAX_HISTORY_TURNS")
                    .unwrap_or_else(|_| "6".to_string())
                    .parse()?,
            },
        })
    }
}

// Defaults mirror from_env with no environment set; tests build on these.
impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                cors_origin: "*".to_string(),
            },
            provider: ProviderConfig {
                base_url: "http://localhost:11434".to_string(),
                embedding_model: "nomic-embed-text".to_string(),
                generation_model: "llama3.2".to_string(),
                embedding_dimensions: 384,
                timeout_ms: 10_000,
                max_retries: 3,
                retry_base_delay_ms: 100,
            },
            rag: RagConfig {
                chunk_size: 1000,
                chunk_overlap: 200,
                max_input_chars: 8192,
                max_batch_size: 32,
                cache_capacity: 4096,
                default_top_k: 5,
                max_top_k: 100,
                min_score: 0.5,
                max_document_chars: 10_000,
                max_message_chars: 1000,
                context_char_budget: 6000,
                max_history_turns: 6,
            },
        }
    }
}
