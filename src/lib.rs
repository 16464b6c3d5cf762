//! Kisan Mitra: farming advisory desktop client.
//!
//! Ask a farming question by text or voice and get Markdown advice with an
//! illustration, look up mandi prices for a location, or photograph soil for
//! a composition report. All answers come from one generative-AI service.

pub mod advisory;
pub mod app;
pub mod audio;
pub mod camera;
pub mod config;
pub mod genai;
pub mod language;
pub mod market;
pub mod pipeline;
pub mod soil;
pub mod speech;
pub mod stt;
