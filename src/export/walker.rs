//! Depth-first, pre-order traversal of the archive tree.

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::error::Result;
use crate::store::MailFolder;

use super::counters::RunCounters;
use super::message::{export_message, MessageOutcome};
use super::ExportContext;

/// Per-item progress report.
#[derive(Debug, Clone, Copy)]
pub struct WalkProgress<'a> {
    /// Name of the folder being processed.
    pub folder: &'a str,
    /// 1-based position of the item in its folder.
    pub index: usize,
    /// Number of items in the folder.
    pub total: usize,
    /// Label of the current item.
    pub item: &'a str,
}

/// Visits every folder once: messages first, then subfolders.
pub struct TreeWalker<'a> {
    ctx: &'a ExportContext<'a>,
    output_root: &'a Path,
    progress: &'a dyn Fn(&WalkProgress<'_>),
    visited: HashSet<String>,
}

impl<'a> TreeWalker<'a> {
    pub fn new(
        ctx: &'a ExportContext<'a>,
        output_root: &'a Path,
        progress: &'a dyn Fn(&WalkProgress<'_>),
    ) -> Self {
        Self {
            ctx,
            output_root,
            progress,
            visited: HashSet::new(),
        }
    }

    /// Walk `folder` and its subtree. Never fails: a folder that cannot be
    /// enumerated is logged and its subtree skipped.
    pub fn walk(&mut self, folder: &dyn MailFolder, counters: &mut RunCounters) {
        if !self.visited.insert(folder.key()) {
            warn!(folder = %folder.name(), "Folder already visited, skipping");
            return;
        }
        counters.folders_visited += 1;

        if let Err(e) = self.walk_folder(folder, counters) {
            counters.folders_failed += 1;
            warn!(folder = %folder.name(), error = %e, "Failed to process folder");
        }
    }

    fn walk_folder(&mut self, folder: &dyn MailFolder, counters: &mut RunCounters) -> Result<()> {
        let items = folder.items()?;
        let total = items.len();
        debug!(folder = %folder.name(), items = total, "Entering folder");

        for (i, item) in items.iter().enumerate() {
            let label = item.label();
            (self.progress)(&WalkProgress {
                folder: folder.name(),
                index: i + 1,
                total,
                item: &label,
            });

            if !item.is_message() {
                debug!(item = %label, "Skipping non-message item");
                continue;
            }
            counters.messages_seen += 1;

            match item.open() {
                Ok(message) => {
                    match export_message(message.as_ref(), self.output_root, self.ctx, counters) {
                        MessageOutcome::Exported { folder: dir, attachments } => {
                            trace!(folder = %dir.display(), attachments, "Message done");
                        }
                        MessageOutcome::Failed { folder: Some(dir), reason } => {
                            debug!(
                                item = %label,
                                folder = %dir.display(),
                                %reason,
                                "Message left incomplete"
                            );
                        }
                        MessageOutcome::Failed { folder: None, reason } => {
                            debug!(item = %label, %reason, "Message skipped");
                        }
                    }
                }
                Err(e) => {
                    warn!(
                        folder = %folder.name(),
                        item = %label,
                        error = %e,
                        "Failed to read message"
                    );
                    counters.failed += 1;
                }
            }
        }
        drop(items);

        for child in folder.subfolders()? {
            self.walk(child.as_ref(), counters);
        }
        Ok(())
    }
}

/// What an export would touch, gathered without writing anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Survey {
    pub folders: u64,
    pub unreadable_folders: u64,
    pub messages: u64,
    pub unreadable_messages: u64,
    pub attachments: u64,
    pub other_items: u64,
}

/// Count folders, messages and attachments under `folder`.
pub fn survey(folder: &dyn MailFolder) -> Survey {
    let mut survey = Survey::default();
    let mut visited = HashSet::new();
    survey_folder(folder, &mut survey, &mut visited);
    survey
}

fn survey_folder(folder: &dyn MailFolder, survey: &mut Survey, visited: &mut HashSet<String>) {
    if !visited.insert(folder.key()) {
        return;
    }
    survey.folders += 1;

    let result = (|| -> Result<()> {
        for item in folder.items()? {
            if !item.is_message() {
                survey.other_items += 1;
                continue;
            }
            survey.messages += 1;
            match item.open().and_then(|m| m.attachments()) {
                Ok(list) => survey.attachments += list.len() as u64,
                Err(_) => survey.unreadable_messages += 1,
            }
        }
        for child in folder.subfolders()? {
            survey_folder(child.as_ref(), survey, visited);
        }
        Ok(())
    })();

    if let Err(e) = result {
        warn!(folder = %folder.name(), error = %e, "Failed to survey folder");
        survey.unreadable_folders += 1;
    }
}
