//! HTTP and WebSocket client for the chatprint conversion backend.
//!
//! Provides job submission and artifact download ([`api`]), the
//! progress notification stream behind a swappable transport trait
//! ([`stream`]), the session runner that drives the core state machine
//! ([`runner`]), and broadcast events for live progress display
//! ([`events`]).

pub mod api;
pub mod events;
pub mod runner;
pub mod stream;
