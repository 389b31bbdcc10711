//! The export pipeline: archive tree → one folder per message, holding the
//! rendered message and its attachments.

pub mod attachment;
pub mod converter;
pub mod counters;
pub mod message;
pub mod naming;
pub mod run;
pub mod walker;

use crate::config::NamingConfig;

use self::converter::DocumentConverter;

/// Read-only collaborators shared by every stage of a run.
pub struct ExportContext<'a> {
    pub converter: DocumentConverter<'a>,
    pub naming: &'a NamingConfig,
}
