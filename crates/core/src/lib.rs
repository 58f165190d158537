//! Pure session-state logic for the chatprint conversion pipeline.
//!
//! Everything in this crate is transport-free: the step registry and its
//! advancement policy, the payment gate, the [`session::JobSession`]
//! aggregate with its single reducer entry point, and the completion
//! resolver. The `chatprint-client` crate feeds decoded notifications
//! into these types.

pub mod error;
pub mod event;
pub mod options;
pub mod payment;
pub mod session;
pub mod steps;
pub mod types;
