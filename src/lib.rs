//! skillroute - chat intent router for serverless skill functions
//!
//! Normalizes Slack and Telegram events into plain text, classifies the
//! sender's intent with a language-model completion, invokes the skill function
//! mapped to that intent and shapes the gateway reply. A companion bearer
//! token authorizer guards the entry point.

pub mod authorizer;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod ingress;
pub mod invoker;
pub mod metrics;
pub mod middleware;
pub mod response;
pub mod skills;
pub mod telemetry;
