pub mod ollama_chat;
pub mod openai_chat;
pub mod prompts;
pub mod stats_file;
pub mod tmdb;

pub use ollama_chat::OllamaChatAdapter;
pub use openai_chat::OpenAiChatAdapter;
pub use prompts::TemplatePromptRenderer;
pub use stats_file::FileStatsRepository;
pub use tmdb::TmdbCatalogAdapter;
