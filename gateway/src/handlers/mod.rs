//! HTTP request handlers
//!
//! - `api` - Health check endpoint
//! - `interact` - Conversational endpoint
//! - `audio` - Synthesized audio download

pub mod api;
pub mod audio;
pub mod interact;
