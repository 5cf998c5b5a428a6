pub mod anthropic_chat;
pub mod db;
pub mod image_fetch;
pub mod openai_chat;
pub mod supabase_auth;
pub mod supabase_storage;

pub use anthropic_chat::AnthropicChatAdapter;
pub use db::PgStudyRepository;
pub use image_fetch::HttpImageFetcher;
pub use openai_chat::OpenAiChatAdapter;
pub use supabase_auth::SupabaseAuthAdapter;
pub use supabase_storage::SupabaseStorageAdapter;
