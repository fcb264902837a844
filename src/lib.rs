// src/lib.rs

pub mod config;
pub mod council;
pub mod llm;
pub mod server;
