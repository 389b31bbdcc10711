//! LibreOffice command-line backend.
//!
//! Each session owns an isolated LibreOffice user profile inside the
//! backend's scratch directory, so a crashed or hung call never leaves a
//! locked profile behind for the next one. Every export is one headless
//! `soffice --convert-to` process, killed if it outlives the timeout.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tempfile::TempDir;
use tracing::{debug, trace};

use crate::config::ConverterConfig;
use crate::error::{ExportError, Result};
use crate::model::kind::DocumentKind;

use super::{BackendSession, DocumentId, RenderBackend};

/// How often a running conversion is polled for completion.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Backend driving a local LibreOffice installation.
#[derive(Debug, Clone)]
pub struct OfficeBackend {
    binary: PathBuf,
    scratch_root: PathBuf,
    timeout: Duration,
}

impl OfficeBackend {
    /// Create a backend keeping its session profiles under `scratch_root`.
    pub fn new(config: &ConverterConfig, scratch_root: impl Into<PathBuf>) -> Self {
        Self {
            binary: config.office_binary.clone(),
            scratch_root: scratch_root.into(),
            timeout: config.timeout(),
        }
    }

    /// Check that the configured binary can be started at all.
    pub fn probe(&self) -> Result<()> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--version").stdout(Stdio::null()).stderr(Stdio::null());
        let status = run_with_timeout(&mut cmd, self.timeout)
            .map_err(|e| ExportError::backend(format!("{}: {e}", self.binary.display())))?;
        if !status.success() {
            return Err(ExportError::backend(format!(
                "{} --version exited with {status}",
                self.binary.display()
            )));
        }
        Ok(())
    }
}

/// LibreOffice PDF export filter for each family.
fn export_filter(kind: DocumentKind) -> Option<&'static str> {
    match kind {
        DocumentKind::Word => Some("writer_pdf_Export"),
        DocumentKind::Spreadsheet => Some("calc_pdf_Export"),
        DocumentKind::Presentation => Some("impress_pdf_Export"),
        DocumentKind::MessageBody => Some("writer_web_pdf_Export"),
        DocumentKind::Unsupported => None,
    }
}

impl RenderBackend for OfficeBackend {
    fn start(&self, kind: DocumentKind) -> Result<Box<dyn BackendSession>> {
        let filter = export_filter(kind)
            .ok_or_else(|| ExportError::backend(format!("No renderer for {kind} documents")))?;

        std::fs::create_dir_all(&self.scratch_root)
            .map_err(|e| ExportError::io(&self.scratch_root, e))?;
        let profile = tempfile::Builder::new()
            .prefix("session-")
            .tempdir_in(&self.scratch_root)
            .map_err(|e| ExportError::io(&self.scratch_root, e))?;

        Ok(Box::new(OfficeSession {
            binary: self.binary.clone(),
            filter,
            timeout: self.timeout,
            profile: Some(profile),
            documents: HashMap::new(),
            next_id: 1,
        }))
    }

    fn reclaim(&self) -> Result<()> {
        if self.scratch_root.exists() {
            std::fs::remove_dir_all(&self.scratch_root)
                .map_err(|e| ExportError::io(&self.scratch_root, e))?;
        }
        Ok(())
    }
}

/// One LibreOffice profile plus the documents opened against it.
struct OfficeSession {
    binary: PathBuf,
    filter: &'static str,
    timeout: Duration,
    profile: Option<TempDir>,
    documents: HashMap<DocumentId, PathBuf>,
    next_id: DocumentId,
}

impl OfficeSession {
    fn profile_dir(&self) -> Result<&Path> {
        self.profile
            .as_ref()
            .map(|p| p.path())
            .ok_or_else(|| ExportError::backend("Session already quit"))
    }
}

impl BackendSession for OfficeSession {
    fn open(&mut self, source: &Path) -> Result<DocumentId> {
        if !source.is_file() {
            return Err(ExportError::backend(format!(
                "Cannot open '{}': not a file",
                source.display()
            )));
        }
        let id = self.next_id;
        self.next_id += 1;
        self.documents.insert(id, source.to_path_buf());
        Ok(id)
    }

    fn export_pdf(&mut self, doc: DocumentId, dest: &Path) -> Result<()> {
        let source = self
            .documents
            .get(&doc)
            .ok_or_else(|| ExportError::backend(format!("Unknown document handle {doc}")))?
            .clone();
        let profile = self.profile_dir()?.to_path_buf();
        let out_dir = profile.join("out");
        std::fs::create_dir_all(&out_dir).map_err(|e| ExportError::io(&out_dir, e))?;

        let mut cmd = Command::new(&self.binary);
        cmd.arg("--headless")
            .arg("--norestore")
            .arg("--nologo")
            .arg("--nodefault")
            .arg(format!("-env:UserInstallation={}", file_url(&profile.join("user"))))
            .arg("--convert-to")
            .arg(format!("pdf:{}", self.filter))
            .arg("--outdir")
            .arg(&out_dir)
            .arg(&source)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        debug!(source = %source.display(), filter = self.filter, "Running soffice");
        let status = run_with_timeout(&mut cmd, self.timeout).map_err(|e| {
            ExportError::backend(format!("{}: {e}", self.binary.display()))
        })?;
        if !status.success() {
            return Err(ExportError::backend(format!("soffice exited with {status}")));
        }

        let stem = source
            .file_stem()
            .ok_or_else(|| ExportError::InvalidPath(source.display().to_string()))?;
        let produced = out_dir.join(format!("{}.pdf", stem.to_string_lossy()));
        if !produced.is_file() {
            return Err(ExportError::backend(format!(
                "soffice produced no PDF for '{}'",
                source.display()
            )));
        }
        move_file(&produced, dest)
    }

    fn close(&mut self, doc: DocumentId) -> Result<()> {
        self.documents
            .remove(&doc)
            .map(|_| ())
            .ok_or_else(|| ExportError::backend(format!("Unknown document handle {doc}")))
    }

    fn quit(&mut self) -> Result<()> {
        self.documents.clear();
        if let Some(profile) = self.profile.take() {
            let path = profile.path().to_path_buf();
            profile.close().map_err(|e| ExportError::io(path, e))?;
        }
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────

/// Spawn `cmd` and wait for it, killing it once `timeout` has elapsed.
fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> std::io::Result<ExitStatus> {
    let mut child = cmd.spawn()?;
    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            trace!(elapsed = ?started.elapsed(), "Child exited");
            return Ok(status);
        }
        if started.elapsed() >= timeout {
            child.kill()?;
            child.wait()?;
            return Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("killed after {timeout:?}"),
            ));
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

/// Move a file, falling back to copy + delete across filesystems.
fn move_file(from: &Path, to: &Path) -> Result<()> {
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    std::fs::copy(from, to).map_err(|e| ExportError::io(to, e))?;
    std::fs::remove_file(from).map_err(|e| ExportError::io(from, e))?;
    Ok(())
}

/// `file://` URL for an absolute path, as LibreOffice expects for `UserInstallation`.
fn file_url(path: &Path) -> String {
    let s = path.to_string_lossy().replace('\\', "/");
    if s.starts_with('/') {
        format!("file://{s}")
    } else {
        format!("file:///{s}")
    }
}
