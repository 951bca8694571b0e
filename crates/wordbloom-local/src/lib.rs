//! Local implementations for `wordbloom`: text statistics, HTML sanitizing, the HTTP clients
//! (direct fetch, fallback endpoint, model) and the orchestrator that ties them together.

pub mod config;
pub mod creative;
pub mod fetch;
pub mod model;
pub mod orchestrate;
pub mod samples;
pub mod sanitize;
pub mod server;
pub mod textstats;
pub mod tiers;

pub use config::AnalyzerConfig;
pub use fetch::HttpFetcher;
pub use orchestrate::Analyzer;
pub use server::ServerClient;
