//! Mail store abstraction: sessions, archives, folders, messages, attachments.
//!
//! The export pipeline only talks to these traits. A store hands out owned
//! handles; dropping a handle releases whatever the store holds for it.

pub mod directory;

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::error::Result;
use crate::model::message::MessageContent;

/// An archive known to a mail session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreInfo {
    /// Session-scoped identifier of the archive.
    pub id: String,
    /// Path the archive was attached from.
    pub path: PathBuf,
    /// Human-readable name.
    pub display_name: String,
}

/// Opens sessions against a mail store backend.
pub trait MailProvider {
    /// Open a new session. Failing here is fatal for a run.
    fn connect(&self) -> Result<Box<dyn MailSession>>;
}

/// A live session with the mail store.
pub trait MailSession {
    /// Archives currently attached to this session.
    fn stores(&self) -> Result<Vec<StoreInfo>>;

    /// Attach an archive file to the session.
    fn attach(&mut self, path: &Path) -> Result<()>;

    /// Detach a previously attached archive.
    fn detach(&mut self, store_id: &str) -> Result<()>;

    /// Root folder of an attached archive.
    fn root_folder(&self, store_id: &str) -> Result<Box<dyn MailFolder>>;

    /// Log off and release the session.
    fn close(&mut self) -> Result<()>;
}

/// A folder node in the archive tree.
pub trait MailFolder {
    /// Display name.
    fn name(&self) -> &str;

    /// Stable identity used to avoid visiting a folder twice.
    fn key(&self) -> String;

    /// Snapshot of the items in this folder, in store order.
    fn items(&self) -> Result<Vec<Box<dyn StoreItem>>>;

    /// Snapshot of the child folders, in store order.
    fn subfolders(&self) -> Result<Vec<Box<dyn MailFolder>>>;
}

/// An entry of a folder. Not every item is a message (calendar entries,
/// contacts, stray files...).
pub trait StoreItem {
    /// Short label for progress and logs.
    fn label(&self) -> String;

    /// Whether this item classifies as a mail message.
    fn is_message(&self) -> bool;

    /// Load the message. Only meaningful when [`StoreItem::is_message`] is true.
    fn open(&self) -> Result<Box<dyn MailMessage>>;
}

/// A message loaded from the store.
pub trait MailMessage {
    /// Subject line (may be empty).
    fn subject(&self) -> &str;

    /// Received timestamp, archive-local.
    fn received(&self) -> NaiveDateTime;

    /// Content used to render the message body.
    fn content(&self) -> Result<MessageContent>;

    /// Attachments in store order.
    fn attachments(&self) -> Result<Vec<Box<dyn MailAttachment>>>;
}

/// A single attachment of a message.
pub trait MailAttachment {
    /// Original file name as stored in the message.
    fn file_name(&self) -> &str;

    /// Write the binary content to `path`. Returns the number of bytes written.
    fn save_to(&self, path: &Path) -> Result<u64>;
}
