//! In-memory mail store and scriptable rendering backend for integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use chrono::{NaiveDate, NaiveDateTime};

use mailpdf::config::Config;
use mailpdf::error::{ExportError, Result};
use mailpdf::model::kind::DocumentKind;
use mailpdf::model::message::MessageContent;
use mailpdf::render::{BackendSession, DocumentId, RenderBackend};
use mailpdf::store::directory::MemoryAttachment;
use mailpdf::store::{
    MailAttachment, MailFolder, MailMessage, MailProvider, MailSession, StoreInfo, StoreItem,
};

/// Config with every delay removed.
pub fn fast_config() -> Config {
    let mut config = Config::default();
    config.converter.retry_delay_ms = 0;
    config.store.attach_wait_ms = 0;
    config
}

pub fn at(y: i32, m: u32, d: u32, hh: u32, mm: u32, ss: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(hh, mm, ss)
        .unwrap()
}

// ─── Store ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct FakeMessage {
    pub subject: String,
    pub received: NaiveDateTime,
    pub attachments: Vec<(String, Vec<u8>)>,
}

impl FakeMessage {
    pub fn new(subject: &str, received: NaiveDateTime) -> Self {
        Self {
            subject: subject.to_string(),
            received,
            attachments: Vec::new(),
        }
    }

    pub fn with_attachment(mut self, name: &str, data: &[u8]) -> Self {
        self.attachments.push((name.to_string(), data.to_vec()));
        self
    }
}

impl MailMessage for FakeMessage {
    fn subject(&self) -> &str {
        &self.subject
    }

    fn received(&self) -> NaiveDateTime {
        self.received
    }

    fn content(&self) -> Result<MessageContent> {
        Ok(MessageContent {
            from: "sender@example.com".into(),
            received: Some(self.received),
            subject: self.subject.clone(),
            text: Some(format!("Body of {}", self.subject)),
            attachment_names: self.attachments.iter().map(|(n, _)| n.clone()).collect(),
            ..Default::default()
        })
    }

    fn attachments(&self) -> Result<Vec<Box<dyn MailAttachment>>> {
        Ok(self
            .attachments
            .iter()
            .map(|(name, data)| {
                Box::new(MemoryAttachment {
                    file_name: name.clone(),
                    data: data.clone(),
                }) as Box<dyn MailAttachment>
            })
            .collect())
    }
}

#[derive(Debug, Clone)]
pub enum FakeItem {
    Message(FakeMessage),
    /// Classifies as a message but cannot be read.
    Unreadable,
    /// Not a message (contact, calendar entry, ...).
    Other(String),
}

impl StoreItem for FakeItem {
    fn label(&self) -> String {
        match self {
            Self::Message(m) => m.subject.clone(),
            Self::Unreadable => "<unreadable>".into(),
            Self::Other(name) => name.clone(),
        }
    }

    fn is_message(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    fn open(&self) -> Result<Box<dyn MailMessage>> {
        match self {
            Self::Message(m) => Ok(Box::new(m.clone())),
            Self::Unreadable => Err(ExportError::store("corrupt message")),
            Self::Other(_) => Err(ExportError::store("not a message")),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeFolder {
    pub name: String,
    pub key: String,
    pub items: Vec<FakeItem>,
    pub children: Vec<FakeFolder>,
    /// Enumeration fails, as for a corrupt or protected folder.
    pub broken: bool,
}

impl FakeFolder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            key: name.to_string(),
            ..Default::default()
        }
    }

    pub fn message(mut self, message: FakeMessage) -> Self {
        self.items.push(FakeItem::Message(message));
        self
    }

    pub fn item(mut self, item: FakeItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn child(mut self, mut child: FakeFolder) -> Self {
        child.key = format!("{}/{}", self.key, child.key);
        self.children.push(child);
        self
    }

    pub fn broken(mut self) -> Self {
        self.broken = true;
        self
    }
}

impl MailFolder for FakeFolder {
    fn name(&self) -> &str {
        &self.name
    }

    fn key(&self) -> String {
        self.key.clone()
    }

    fn items(&self) -> Result<Vec<Box<dyn StoreItem>>> {
        if self.broken {
            return Err(ExportError::store("access denied"));
        }
        Ok(self
            .items
            .iter()
            .cloned()
            .map(|i| Box::new(i) as Box<dyn StoreItem>)
            .collect())
    }

    fn subfolders(&self) -> Result<Vec<Box<dyn MailFolder>>> {
        if self.broken {
            return Err(ExportError::store("access denied"));
        }
        Ok(self
            .children
            .iter()
            .cloned()
            .map(|f| Box::new(f) as Box<dyn MailFolder>)
            .collect())
    }
}

/// Everything the fake session saw.
#[derive(Debug, Default)]
pub struct SessionLog {
    pub attached: Vec<StoreInfo>,
    pub calls: Vec<String>,
}

pub struct FakeProvider {
    pub root: FakeFolder,
    pub log: Rc<RefCell<SessionLog>>,
    /// Attach succeeds but the store never shows up.
    pub invisible: bool,
}

impl FakeProvider {
    pub fn new(root: FakeFolder) -> Self {
        Self {
            root,
            log: Rc::new(RefCell::new(SessionLog::default())),
            invisible: false,
        }
    }

    /// Pretend `archive` was attached before the run started.
    pub fn preattach(self, archive: &Path) -> Self {
        self.log.borrow_mut().attached.push(store_info(archive));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.borrow().calls.clone()
    }
}

fn store_info(archive: &Path) -> StoreInfo {
    StoreInfo {
        id: format!("store:{}", archive.display()),
        path: archive.to_path_buf(),
        display_name: "Fake archive".into(),
    }
}

impl MailProvider for FakeProvider {
    fn connect(&self) -> Result<Box<dyn MailSession>> {
        self.log.borrow_mut().calls.push("connect".into());
        Ok(Box::new(FakeSession {
            root: self.root.clone(),
            log: Rc::clone(&self.log),
            invisible: self.invisible,
        }))
    }
}

struct FakeSession {
    root: FakeFolder,
    log: Rc<RefCell<SessionLog>>,
    invisible: bool,
}

impl MailSession for FakeSession {
    fn stores(&self) -> Result<Vec<StoreInfo>> {
        Ok(self.log.borrow().attached.clone())
    }

    fn attach(&mut self, path: &Path) -> Result<()> {
        let mut log = self.log.borrow_mut();
        log.calls.push("attach".into());
        if !self.invisible {
            log.attached.push(store_info(path));
        }
        Ok(())
    }

    fn detach(&mut self, store_id: &str) -> Result<()> {
        let mut log = self.log.borrow_mut();
        log.calls.push("detach".into());
        log.attached.retain(|s| s.id != store_id);
        Ok(())
    }

    fn root_folder(&self, _store_id: &str) -> Result<Box<dyn MailFolder>> {
        Ok(Box::new(self.root.clone()))
    }

    fn close(&mut self) -> Result<()> {
        self.log.borrow_mut().calls.push("close".into());
        Ok(())
    }
}

// ─── Backend ────────────────────────────────────────────────────────

/// Counts of what the fake backend was asked to do.
#[derive(Debug, Default)]
pub struct BackendLog {
    pub started: Vec<DocumentKind>,
    pub quits: usize,
    pub opened: usize,
    pub closed: usize,
    pub exports: usize,
    pub reclaimed: usize,
}

/// Writes a small fake PDF for every export, except when the source's
/// file name or content contains one of `fail_on`.
#[derive(Default)]
pub struct FakeBackend {
    pub fail_on: Vec<String>,
    pub log: Rc<RefCell<BackendLog>>,
}

impl FakeBackend {
    pub fn failing_on(markers: &[&str]) -> Self {
        Self {
            fail_on: markers.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }
}

impl RenderBackend for FakeBackend {
    fn start(&self, kind: DocumentKind) -> Result<Box<dyn BackendSession>> {
        if !kind.is_renderable() {
            return Err(ExportError::backend("unsupported"));
        }
        self.log.borrow_mut().started.push(kind);
        Ok(Box::new(FakeBackendSession {
            fail_on: self.fail_on.clone(),
            log: Rc::clone(&self.log),
            documents: Vec::new(),
        }))
    }

    fn reclaim(&self) -> Result<()> {
        self.log.borrow_mut().reclaimed += 1;
        Ok(())
    }
}

struct FakeBackendSession {
    fail_on: Vec<String>,
    log: Rc<RefCell<BackendLog>>,
    documents: Vec<PathBuf>,
}

impl BackendSession for FakeBackendSession {
    fn open(&mut self, source: &Path) -> Result<DocumentId> {
        self.log.borrow_mut().opened += 1;
        self.documents.push(source.to_path_buf());
        Ok(self.documents.len() as DocumentId - 1)
    }

    fn export_pdf(&mut self, doc: DocumentId, dest: &Path) -> Result<()> {
        self.log.borrow_mut().exports += 1;
        let source = &self.documents[doc as usize];
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let content = std::fs::read_to_string(source).unwrap_or_default();
        // a failing backend may still leave a partial file
        std::fs::write(dest, b"%PDF-1.4 partial").map_err(|e| ExportError::io(dest, e))?;
        if self
            .fail_on
            .iter()
            .any(|m| name.contains(m.as_str()) || content.contains(m.as_str()))
        {
            return Err(ExportError::backend("automation server threw"));
        }
        std::fs::write(dest, b"%PDF-1.4 fake").map_err(|e| ExportError::io(dest, e))?;
        Ok(())
    }

    fn close(&mut self, _doc: DocumentId) -> Result<()> {
        self.log.borrow_mut().closed += 1;
        Ok(())
    }

    fn quit(&mut self) -> Result<()> {
        self.log.borrow_mut().quits += 1;
        Ok(())
    }
}
