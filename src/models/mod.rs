//! Data models module
//!
//! Defines request and response data structures for the OpenAI chat completions API

pub mod openai;
