//! LLM model backend implementations for Chatloom.
//!
//! All backends implement the `chatloom_core::Model` trait. The CLI
//! selects the backend based on configuration.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatModel;
