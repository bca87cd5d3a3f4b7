//! Guardrail - Request Rate Limiting and Abuse-Control Engine
//!
//! This crate decides, for every inbound HTTP request, whether it may proceed
//! or must be rejected because a caller (by IP, by authenticated identity, or
//! by a specific business action) has exceeded an allowed rate. Counter state
//! is in-memory and process-local; the storage boundary in [`ratelimit`]
//! keeps a shared external store substitutable without changing the engine.

pub mod config;
pub mod error;
pub mod http;
pub mod ratelimit;
