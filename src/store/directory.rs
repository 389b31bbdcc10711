//! Directory-tree archives: every directory is a folder, every `.eml` file a message.
//!
//! Items and subfolders are enumerated in file-name order. Symlinked
//! directories are not followed, so a folder can't be reached twice.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Utc};
use mail_parser::{MessageParser, MimeHeaders};
use tracing::debug;

use crate::error::{ExportError, Result};
use crate::model::message::MessageContent;

use super::{
    MailAttachment, MailFolder, MailMessage, MailProvider, MailSession, StoreInfo, StoreItem,
};

/// Provider for directory-tree archives.
#[derive(Debug, Default, Clone)]
pub struct DirectoryProvider;

impl MailProvider for DirectoryProvider {
    fn connect(&self) -> Result<Box<dyn MailSession>> {
        Ok(Box::new(DirectorySession::default()))
    }
}

/// A session keeping track of which archives are attached.
#[derive(Debug, Default)]
pub struct DirectorySession {
    attached: Vec<StoreInfo>,
}

impl MailSession for DirectorySession {
    fn stores(&self) -> Result<Vec<StoreInfo>> {
        Ok(self.attached.clone())
    }

    fn attach(&mut self, path: &Path) -> Result<()> {
        if !path.is_dir() {
            return Err(ExportError::store(format!(
                "'{}' is not an archive directory",
                path.display()
            )));
        }
        let path = path.canonicalize().map_err(|e| ExportError::io(path, e))?;
        if self.attached.iter().any(|s| s.path == path) {
            return Ok(());
        }

        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let id = format!("dir:{}", path.display());
        debug!(id = %id, "Attached archive");
        self.attached.push(StoreInfo {
            id,
            path,
            display_name,
        });
        Ok(())
    }

    fn detach(&mut self, store_id: &str) -> Result<()> {
        let before = self.attached.len();
        self.attached.retain(|s| s.id != store_id);
        if self.attached.len() == before {
            return Err(ExportError::store(format!("No attached archive '{store_id}'")));
        }
        Ok(())
    }

    fn root_folder(&self, store_id: &str) -> Result<Box<dyn MailFolder>> {
        let info = self
            .attached
            .iter()
            .find(|s| s.id == store_id)
            .ok_or_else(|| ExportError::store(format!("No attached archive '{store_id}'")))?;
        Ok(Box::new(DirectoryFolder::new(info.path.clone(), info.display_name.clone())))
    }

    fn close(&mut self) -> Result<()> {
        self.attached.clear();
        Ok(())
    }
}

/// A directory seen as a mail folder.
#[derive(Debug)]
pub struct DirectoryFolder {
    path: PathBuf,
    name: String,
}

impl DirectoryFolder {
    pub fn new(path: PathBuf, name: String) -> Self {
        Self { path, name }
    }

    /// Directory entries sorted by file name.
    fn sorted_entries(&self) -> Result<Vec<std::fs::DirEntry>> {
        let read = std::fs::read_dir(&self.path).map_err(|e| ExportError::io(&self.path, e))?;
        let mut entries = read
            .collect::<std::io::Result<Vec<_>>>()
            .map_err(|e| ExportError::io(&self.path, e))?;
        entries.sort_by_key(|e| e.file_name());
        Ok(entries)
    }
}

impl MailFolder for DirectoryFolder {
    fn name(&self) -> &str {
        &self.name
    }

    fn key(&self) -> String {
        self.path.display().to_string()
    }

    fn items(&self) -> Result<Vec<Box<dyn StoreItem>>> {
        let mut items: Vec<Box<dyn StoreItem>> = Vec::new();
        for entry in self.sorted_entries()? {
            let file_type = entry.file_type().map_err(|e| ExportError::io(entry.path(), e))?;
            if file_type.is_file() {
                items.push(Box::new(FileItem { path: entry.path() }));
            }
        }
        Ok(items)
    }

    fn subfolders(&self) -> Result<Vec<Box<dyn MailFolder>>> {
        let mut folders: Vec<Box<dyn MailFolder>> = Vec::new();
        for entry in self.sorted_entries()? {
            // DirEntry::file_type does not follow symlinks
            let file_type = entry.file_type().map_err(|e| ExportError::io(entry.path(), e))?;
            if file_type.is_dir() {
                let name = entry.file_name().to_string_lossy().into_owned();
                folders.push(Box::new(DirectoryFolder::new(entry.path(), name)));
            }
        }
        Ok(folders)
    }
}

/// A regular file inside an archive directory.
#[derive(Debug)]
pub struct FileItem {
    path: PathBuf,
}

impl StoreItem for FileItem {
    fn label(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn is_message(&self) -> bool {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("eml"))
    }

    fn open(&self) -> Result<Box<dyn MailMessage>> {
        Ok(Box::new(EmlMessage::load(&self.path)?))
    }
}

/// A message backed by a `.eml` file.
///
/// Only the raw bytes plus subject and timestamp are kept; the MIME tree is
/// parsed again whenever content or attachments are requested.
#[derive(Debug)]
pub struct EmlMessage {
    raw: Vec<u8>,
    subject: String,
    received: NaiveDateTime,
}

impl EmlMessage {
    /// Read and parse an `.eml` file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read(path).map_err(|e| ExportError::io(path, e))?;
        let (subject, date) = {
            let msg = MessageParser::default().parse(&raw).ok_or_else(|| {
                ExportError::store(format!("'{}' is not a parseable message", path.display()))
            })?;
            (
                msg.subject().unwrap_or("").to_string(),
                msg.date().and_then(header_wall_clock),
            )
        };

        let received = match date {
            Some(d) => d,
            None => {
                debug!(path = %path.display(), "No usable Date header, using file mtime");
                file_mtime(path)
            }
        };

        Ok(Self {
            raw,
            subject,
            received,
        })
    }

    /// Build a message directly from raw RFC 5322 bytes.
    pub fn from_bytes(raw: Vec<u8>) -> Result<Self> {
        let (subject, received) = {
            let msg = MessageParser::default()
                .parse(&raw)
                .ok_or_else(|| ExportError::store("Bytes are not a parseable message"))?;
            (
                msg.subject().unwrap_or("").to_string(),
                msg.date()
                    .and_then(header_wall_clock)
                    .unwrap_or(DateTime::<Utc>::UNIX_EPOCH.naive_utc()),
            )
        };
        Ok(Self {
            raw,
            subject,
            received,
        })
    }

    fn parse(&self) -> Result<mail_parser::Message<'_>> {
        MessageParser::default()
            .parse(&self.raw)
            .ok_or_else(|| ExportError::store("Message could not be re-parsed"))
    }
}

impl MailMessage for EmlMessage {
    fn subject(&self) -> &str {
        &self.subject
    }

    fn received(&self) -> NaiveDateTime {
        self.received
    }

    fn content(&self) -> Result<MessageContent> {
        let msg = self.parse()?;
        let attachment_names = msg
            .attachments()
            .enumerate()
            .map(|(idx, part)| attachment_name(part.attachment_name(), idx))
            .collect();

        Ok(MessageContent {
            from: msg.from().map(format_addresses).unwrap_or_default().join(", "),
            to: msg.to().map(format_addresses).unwrap_or_default(),
            cc: msg.cc().map(format_addresses).unwrap_or_default(),
            received: Some(self.received),
            subject: self.subject.clone(),
            text: msg.body_text(0).map(|s| s.into_owned()),
            html: msg.body_html(0).map(|s| s.into_owned()),
            attachment_names,
        })
    }

    fn attachments(&self) -> Result<Vec<Box<dyn MailAttachment>>> {
        let msg = self.parse()?;
        let attachments = msg
            .attachments()
            .enumerate()
            .map(|(idx, part)| {
                Box::new(MemoryAttachment {
                    file_name: attachment_name(part.attachment_name(), idx),
                    data: part.contents().to_vec(),
                }) as Box<dyn MailAttachment>
            })
            .collect();
        Ok(attachments)
    }
}

/// Attachment content decoded into memory.
#[derive(Debug, Clone)]
pub struct MemoryAttachment {
    pub file_name: String,
    pub data: Vec<u8>,
}

impl MailAttachment for MemoryAttachment {
    fn file_name(&self) -> &str {
        &self.file_name
    }

    fn save_to(&self, path: &Path) -> Result<u64> {
        std::fs::write(path, &self.data).map_err(|e| ExportError::io(path, e))?;
        Ok(self.data.len() as u64)
    }
}

// ── Helpers ─────────────────────────────────────────────────────

/// Attachment name, generated when the part carries none.
fn attachment_name(name: Option<&str>, idx: usize) -> String {
    match name {
        Some(n) if !n.trim().is_empty() => n.to_string(),
        _ => format!("attachment_{idx}"),
    }
}

/// Wall-clock time as written in the `Date:` header.
fn header_wall_clock(date: &mail_parser::DateTime) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(date.year as i32, date.month as u32, date.day as u32)?.and_hms_opt(
        date.hour as u32,
        date.minute as u32,
        date.second as u32,
    )
}

fn file_mtime(path: &Path) -> NaiveDateTime {
    let modified = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH);
    DateTime::<Local>::from(modified).naive_local()
}

fn format_addresses(addr: &mail_parser::Address<'_>) -> Vec<String> {
    addr.iter()
        .map(|a| match (a.name.as_deref(), a.address.as_deref()) {
            (Some(name), Some(address)) => format!("{name} <{address}>"),
            (Some(name), None) => name.to_string(),
            (None, Some(address)) => address.to_string(),
            (None, None) => String::new(),
        })
        .filter(|s| !s.is_empty())
        .collect()
}
