pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod generator;
pub mod llm;
pub mod prompts;
pub mod rewriter;
pub mod selector;
pub mod service;
