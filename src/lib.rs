//! `mailpdf`: export a mail archive to one folder per message.
//!
//! Each message folder holds the message rendered to PDF plus every
//! attachment, itself rendered to PDF when a renderer exists for its type.
//! The mail store and the rendering backend are traits
//! ([`store::MailProvider`], [`render::RenderBackend`]); a directory-tree
//! store and a LibreOffice backend are provided.

pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod render;
pub mod store;
