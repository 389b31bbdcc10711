//! Document rendering backends and the scoped handles wrapping them.
//!
//! A backend hands out one session per [`DocumentKind`]. Sessions and the
//! documents opened in them are wrapped in guards that release the backend
//! side on drop, on success and failure alike.

pub mod office;

use std::path::Path;

use tracing::{debug, warn};

use crate::error::Result;
use crate::model::kind::DocumentKind;

/// Backend-assigned handle of an opened document.
pub type DocumentId = u64;

/// A rendering backend able to start per-family sessions.
pub trait RenderBackend {
    /// Start a session for one family. `Unsupported` must be rejected.
    fn start(&self, kind: DocumentKind) -> Result<Box<dyn BackendSession>>;

    /// Ask the backend to free anything left over from the run.
    fn reclaim(&self) -> Result<()> {
        Ok(())
    }
}

/// One live backend session (one automation server, one profile, ...).
pub trait BackendSession {
    /// Open a source document.
    fn open(&mut self, source: &Path) -> Result<DocumentId>;

    /// Export an opened document as PDF to `dest`.
    fn export_pdf(&mut self, doc: DocumentId, dest: &Path) -> Result<()>;

    /// Close an opened document.
    fn close(&mut self, doc: DocumentId) -> Result<()>;

    /// End the session.
    fn quit(&mut self) -> Result<()>;
}

/// Scoped backend session: quits on drop.
pub struct RenderSession {
    kind: DocumentKind,
    inner: Box<dyn BackendSession>,
}

impl RenderSession {
    /// Start a session of `kind` on `backend`.
    pub fn start(backend: &dyn RenderBackend, kind: DocumentKind) -> Result<Self> {
        let inner = backend.start(kind)?;
        debug!(kind = %kind, "Backend session started");
        Ok(Self { kind, inner })
    }

    /// Open a document; it is closed when the returned guard drops.
    pub fn open(&mut self, source: &Path) -> Result<OpenDocument<'_>> {
        let id = self.inner.open(source)?;
        Ok(OpenDocument {
            session: self.inner.as_mut(),
            id,
        })
    }
}

impl Drop for RenderSession {
    fn drop(&mut self) {
        if let Err(e) = self.inner.quit() {
            warn!(kind = %self.kind, error = %e, "Failed to quit backend session");
        }
    }
}

/// Scoped open document: closes on drop.
pub struct OpenDocument<'s> {
    session: &'s mut (dyn BackendSession + 'static),
    id: DocumentId,
}

impl OpenDocument<'_> {
    /// Export this document as PDF.
    pub fn export_pdf(&mut self, dest: &Path) -> Result<()> {
        self.session.export_pdf(self.id, dest)
    }
}

impl Drop for OpenDocument<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.session.close(self.id) {
            warn!(doc = self.id, error = %e, "Failed to close backend document");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::error::ExportError;

    /// Records every call made on the session.
    struct Recorder {
        log: Rc<RefCell<Vec<String>>>,
        fail_export: bool,
    }

    impl BackendSession for Recorder {
        fn open(&mut self, source: &Path) -> Result<DocumentId> {
            self.log.borrow_mut().push(format!("open {}", source.display()));
            Ok(7)
        }

        fn export_pdf(&mut self, doc: DocumentId, _dest: &Path) -> Result<()> {
            self.log.borrow_mut().push(format!("export {doc}"));
            if self.fail_export {
                Err(ExportError::backend("boom"))
            } else {
                Ok(())
            }
        }

        fn close(&mut self, doc: DocumentId) -> Result<()> {
            self.log.borrow_mut().push(format!("close {doc}"));
            Ok(())
        }

        fn quit(&mut self) -> Result<()> {
            self.log.borrow_mut().push("quit".into());
            Ok(())
        }
    }

    struct RecordingBackend {
        log: Rc<RefCell<Vec<String>>>,
        fail_export: bool,
    }

    impl RenderBackend for RecordingBackend {
        fn start(&self, _kind: DocumentKind) -> Result<Box<dyn BackendSession>> {
            self.log.borrow_mut().push("start".into());
            Ok(Box::new(Recorder {
                log: Rc::clone(&self.log),
                fail_export: self.fail_export,
            }))
        }
    }

    fn run(fail_export: bool) -> (Result<()>, Vec<String>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let backend = RecordingBackend {
            log: Rc::clone(&log),
            fail_export,
        };
        let result = (|| -> Result<()> {
            let mut session = RenderSession::start(&backend, DocumentKind::Word)?;
            let mut doc = session.open(Path::new("a.docx"))?;
            doc.export_pdf(Path::new("a.pdf"))
        })();
        let calls = log.borrow().clone();
        (result, calls)
    }

    #[test]
    fn test_handles_released_on_success() {
        let (result, calls) = run(false);
        assert!(result.is_ok());
        assert_eq!(calls, vec!["start", "open a.docx", "export 7", "close 7", "quit"]);
    }

    #[test]
    fn test_handles_released_on_failure() {
        let (result, calls) = run(true);
        assert!(result.is_err());
        assert_eq!(calls, vec!["start", "open a.docx", "export 7", "close 7", "quit"]);
    }
}
