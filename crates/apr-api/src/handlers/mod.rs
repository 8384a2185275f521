//! HTTP handlers, one module per route group.

pub mod ai;
pub mod chat;
pub mod health;
pub mod notes;
pub mod papers;
pub mod pdf;
