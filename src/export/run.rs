//! Top-level orchestration of one export run.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{ExportError, Result};
use crate::render::RenderBackend;
use crate::store::{MailFolder, MailProvider, MailSession, StoreInfo};

use super::converter::DocumentConverter;
use super::counters::{RunCounters, RunSummary};
use super::walker::{survey, Survey, TreeWalker, WalkProgress};
use super::ExportContext;

/// Export every message of `archive` into `output_root`.
///
/// Only setup failures are returned as errors. Whatever happens, an archive
/// attached by this run is detached, the mail session is closed and the
/// backend is asked to reclaim its resources; failures while doing so are
/// logged and never replace the run's own result.
pub fn run(
    provider: &dyn MailProvider,
    backend: &dyn RenderBackend,
    archive: &Path,
    output_root: &Path,
    config: &Config,
    progress: &dyn Fn(&WalkProgress<'_>),
) -> Result<RunSummary> {
    let result = export_archive(provider, backend, archive, output_root, config, progress);
    if let Err(e) = backend.reclaim() {
        warn!(error = %e, "Backend resource reclamation failed");
    }
    result
}

fn export_archive(
    provider: &dyn MailProvider,
    backend: &dyn RenderBackend,
    archive: &Path,
    output_root: &Path,
    config: &Config,
    progress: &dyn Fn(&WalkProgress<'_>),
) -> Result<RunSummary> {
    std::fs::create_dir_all(output_root).map_err(|e| ExportError::OutputRoot {
        path: output_root.to_path_buf(),
        source: e,
    })?;

    let mut session = ConnectedSession::open(provider)?;
    let attached = AttachedArchive::open(session.get(), archive, config.store.attach_wait())?;
    let root = attached.root_folder()?;

    let ctx = ExportContext {
        converter: DocumentConverter::new(backend, &config.converter),
        naming: &config.naming,
    };
    let mut counters = RunCounters::default();
    let started = Instant::now();

    info!(archive = %archive.display(), output = %output_root.display(), "Export started");
    TreeWalker::new(&ctx, output_root, progress).walk(root.as_ref(), &mut counters);

    let summary = RunSummary::new(
        archive.to_path_buf(),
        output_root.to_path_buf(),
        counters,
        started.elapsed(),
    );
    info!(
        seen = summary.counters.messages_seen,
        exported = summary.counters.exported,
        failed = summary.counters.failed,
        "Export finished"
    );
    Ok(summary)
}

/// Walk `archive` without exporting anything and report what was found.
pub fn dry_run(provider: &dyn MailProvider, archive: &Path, config: &Config) -> Result<Survey> {
    let mut session = ConnectedSession::open(provider)?;
    let attached = AttachedArchive::open(session.get(), archive, config.store.attach_wait())?;
    let root = attached.root_folder()?;
    Ok(survey(root.as_ref()))
}

// ── Scoped store handles ────────────────────────────────────────

/// A mail session closed on drop.
struct ConnectedSession {
    inner: Box<dyn MailSession>,
}

impl ConnectedSession {
    fn open(provider: &dyn MailProvider) -> Result<Self> {
        let inner = provider.connect()?;
        debug!("Mail session opened");
        Ok(Self { inner })
    }

    fn get(&mut self) -> &mut (dyn MailSession + 'static) {
        self.inner.as_mut()
    }
}

impl Drop for ConnectedSession {
    fn drop(&mut self) {
        if let Err(e) = self.inner.close() {
            warn!(error = %e, "Failed to close mail session");
        }
    }
}

/// The archive as seen by the session. Detached on drop, but only when
/// this run attached it.
struct AttachedArchive<'s> {
    session: &'s mut (dyn MailSession + 'static),
    store: StoreInfo,
    attached_here: bool,
}

impl<'s> AttachedArchive<'s> {
    fn open(
        session: &'s mut (dyn MailSession + 'static),
        archive: &Path,
        attach_wait: Duration,
    ) -> Result<Self> {
        if let Some(store) = locate(&*session, archive)? {
            debug!(store = %store.id, "Archive already attached");
            return Ok(Self {
                session,
                store,
                attached_here: false,
            });
        }

        session.attach(archive)?;
        if !attach_wait.is_zero() {
            debug!(wait = ?attach_wait, "Waiting for the archive to become available");
            std::thread::sleep(attach_wait);
        }

        // Without a store id there is nothing to detach; closing the session
        // releases the archive.
        let store = locate(&*session, archive)?
            .ok_or_else(|| ExportError::ArchiveNotLocated(archive.to_path_buf()))?;
        info!(store = %store.display_name, "Archive attached");
        Ok(Self {
            session,
            store,
            attached_here: true,
        })
    }

    fn root_folder(&self) -> Result<Box<dyn MailFolder>> {
        self.session.root_folder(&self.store.id)
    }
}

impl Drop for AttachedArchive<'_> {
    fn drop(&mut self) {
        if !self.attached_here {
            return;
        }
        match self.session.detach(&self.store.id) {
            Ok(()) => debug!(store = %self.store.id, "Archive detached"),
            Err(e) => warn!(store = %self.store.id, error = %e, "Failed to detach archive"),
        }
    }
}

/// Find the attached store backed by `archive`.
fn locate(session: &dyn MailSession, archive: &Path) -> Result<Option<StoreInfo>> {
    Ok(session
        .stores()?
        .into_iter()
        .find(|s| same_path(&s.path, archive)))
}

fn same_path(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    let canonical = |p: &Path| -> Option<PathBuf> { p.canonicalize().ok() };
    matches!((canonical(a), canonical(b)), (Some(x), Some(y)) if x == y)
}
