//! Route modules for the GEKO annotator service

pub mod annotations;
pub mod export;
pub mod health;
pub mod ner;
