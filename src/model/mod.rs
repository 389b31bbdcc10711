//! Core data model types: renderable message content and document kinds.

pub mod kind;
pub mod message;
