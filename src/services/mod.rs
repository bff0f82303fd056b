pub mod content;
pub mod llm_provider;
pub mod quiz;
pub mod roadmap;
pub mod tutor;
