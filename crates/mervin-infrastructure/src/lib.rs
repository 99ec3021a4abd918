//! Infrastructure layer: conversation storage and configuration files.

pub mod config_service;
pub mod dto;
pub mod memory_conversation_repository;
pub mod paths;
pub mod storage;
pub mod toml_conversation_repository;

pub use crate::config_service::ConfigService;
pub use crate::memory_conversation_repository::MemoryConversationRepository;
pub use crate::paths::MervinPaths;
pub use crate::toml_conversation_repository::TomlConversationRepository;
