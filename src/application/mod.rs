//! Application layer orchestrating the domain over the storage ports.
//!
//! [`calculator::CompensationCalculator`] owns the salary rule and attendance
//! recording, [`directory::Directory`] the administrative records, and
//! [`conversation::Conversation`] the chat-facing state machine built on both.

pub mod calculator;
pub mod conversation;
pub mod directory;
