pub mod cli;
pub mod commands;
pub mod config;
pub mod doc_processor;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod session;
pub mod splitter;
pub mod vector_index;
pub mod web;
