//! Altar service: resilient generative-AI requests and real-time
//! collaboration for a wedding-planning app.

pub mod ai;
pub mod api;
pub mod collaboration;
pub mod config;
pub mod error;
pub mod i18n;
pub mod websocket;
