//! Shared domain types for the OKR assistant: the conversation message
//! model, the common error type, configuration, and structured trace events.

pub mod config;
pub mod error;
pub mod message;
pub mod trace;
