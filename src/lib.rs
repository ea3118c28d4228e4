//! # Reservations Telegram Bot
//!
//! A Telegram bot that walks users through a multi-step table reservation:
//! date, seating area, time, party size, and a final confirmation. The flow
//! engine is transport-agnostic; the Telegram layer plugs in at the edges.

/// Telegram handlers and the Telegram-backed message port
pub mod bot;
/// Callback payload encoding and decoding for inline buttons
pub mod callback;
/// Flow engine tunables and the prompt cleanup policy
pub mod config;
/// Domain context snapshots and domain-side validity queries
pub mod domain;
/// Error types surfaced by the flow engine
pub mod errors;
/// The step-by-step flow engine itself
pub mod flow;
/// Outbound transport and completion seams
pub mod transport;
/// Built-in venue directory and the in-memory completion sink
pub mod venues;
