//! Filesystem-safe names and collision-free output paths.

use std::path::{Path, PathBuf};

/// Characters rejected by at least one common filesystem.
const ILLEGAL_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Device names Windows refuses as file names, whatever the extension.
const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Name used when nothing survives sanitization.
pub const UNTITLED: &str = "Untitled";

/// Turn arbitrary text into a file or folder name.
///
/// Illegal and control characters become `_`, the result is cut to
/// `max_len` characters, trailing dots and spaces are stripped, and an
/// empty result falls back to `fallback`.
pub fn sanitize_with_fallback(text: &str, max_len: usize, fallback: &str) -> String {
    let replaced: String = replace_illegal(text).chars().take(max_len).collect();

    let trimmed = replaced.trim_end_matches(['.', ' ']);
    if trimmed.is_empty() {
        return fallback.chars().take(max_len.max(1)).collect();
    }

    if !is_reserved(trimmed) {
        return trimmed.to_string();
    }
    let prefixed: String = format!("_{trimmed}").chars().take(max_len).collect();
    prefixed.trim_end_matches(['.', ' ']).to_string()
}

/// [`sanitize_with_fallback`] with the `"Untitled"` fallback.
pub fn sanitize(text: &str, max_len: usize) -> String {
    sanitize_with_fallback(text, max_len, UNTITLED)
}

/// Like [`sanitize_with_fallback`], but truncation eats into the stem so the
/// extension survives: `<200 x>.docx` keeps its `.docx`.
///
/// Names whose extension alone does not fit are sanitized as a whole.
pub fn sanitize_file_name(text: &str, max_len: usize, fallback: &str) -> String {
    let replaced = replace_illegal(text);
    let (stem, ext) = split_extension(&replaced);
    let ext = ext.map(|e| e.trim_end_matches(['.', ' '])).unwrap_or("");
    let ext_len = ext.chars().count();

    if ext.is_empty() || ext_len + 2 > max_len {
        return sanitize_with_fallback(text, max_len, fallback);
    }
    let stem = sanitize_with_fallback(stem, max_len - ext_len - 1, fallback);
    format!("{stem}.{ext}")
}

fn replace_illegal(text: &str) -> String {
    text.chars()
        .map(|c| {
            if ILLEGAL_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect()
}

fn is_reserved(name: &str) -> bool {
    let stem = name.split('.').next().unwrap_or(name);
    RESERVED_NAMES.iter().any(|r| r.eq_ignore_ascii_case(stem))
}

/// First path under `base` named after `desired` that does not exist yet.
///
/// Collisions get `_1`, `_2`, ... appended to the whole name. Used for
/// directories, where a dot in a subject is not an extension. The name is
/// shortened as needed so the suffixed name still fits in `max_len`.
pub fn unique_dir_path(base: &Path, desired: &str, max_len: usize) -> PathBuf {
    let name = sanitize(desired, max_len);
    first_free(base, |n| match n {
        0 => name.clone(),
        n => {
            let suffix = format!("_{n}");
            format!("{}{suffix}", shorten(&name, max_len, &suffix))
        }
    })
}

/// First path under `base` named after `desired` that does not exist yet.
///
/// Collisions get the counter inserted before the extension:
/// `report.docx`, `report_1.docx`, `report_2.docx`, ... The stem is
/// shortened as needed so the suffixed name still fits in `max_len`.
pub fn unique_file_path(base: &Path, desired: &str, max_len: usize) -> PathBuf {
    let name = sanitize_file_name(desired, max_len, UNTITLED);
    let (stem, ext) = split_extension(&name);
    first_free(base, |n| match (n, ext) {
        (0, _) => name.clone(),
        (n, Some(ext)) => {
            let suffix = format!("_{n}.{ext}");
            format!("{}{suffix}", shorten(stem, max_len, &suffix))
        }
        (n, None) => {
            let suffix = format!("_{n}");
            format!("{}{suffix}", shorten(stem, max_len, &suffix))
        }
    })
}

/// Cut `name` so that `name + suffix` fits in `max_len` characters, keeping
/// at least one character.
fn shorten(name: &str, max_len: usize, suffix: &str) -> String {
    let room = max_len.saturating_sub(suffix.chars().count()).max(1);
    let cut: String = name.chars().take(room).collect();
    match cut.trim_end_matches(['.', ' ']) {
        "" => "_".to_string(),
        trimmed => trimmed.to_string(),
    }
}

/// Split `name` into stem and extension. Leading-dot names have no extension.
fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < name.len() => (&name[..idx], Some(&name[idx + 1..])),
        _ => (name, None),
    }
}

/// Probe candidates `0, 1, 2, ...` until one does not exist.
///
/// The check and the later creation are not atomic, so only one process may
/// write to an output directory at a time.
fn first_free(base: &Path, candidate: impl Fn(u64) -> String) -> PathBuf {
    let mut n = 0;
    loop {
        let path = base.join(candidate(n));
        // symlink_metadata also catches dangling symlinks
        if std::fs::symlink_metadata(&path).is_err() {
            return path;
        }
        n += 1;
    }
}
