use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::UNIX_EPOCH;

use glob::Pattern;
use log::info;
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::error::ScanError;

/// SHA-256 of file contents, lowercase hex
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(bytes: &[u8]) -> Fingerprint {
        Fingerprint(format!("{:x}", Sha256::digest(bytes)))
    }

    /// Accepts the output of `sha256sum`
    pub fn from_hex(hex: &str) -> Option<Fingerprint> {
        let valid = hex.len() == 64 && hex.chars().all(|c| c.is_ascii_hexdigit());
        valid.then(|| Fingerprint(hex.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileEntry {
    /// `/`-separated, relative to the tree root
    pub relative_path: String,
    pub fingerprint: Fingerprint,
    pub size: u64,
    /// Seconds since the unix epoch. Informational only, never used for diffing.
    pub modified_time: i64,
}

/// A scanned tree keyed by relative path
pub type FileTree = BTreeMap<String, FileEntry>;

/// Glob patterns for paths that are never synchronised
///
/// A pattern matches if it matches any single path component (`.git`, `*.pyc`) or the whole
/// relative path (`data/raw/*`). A trailing `/` is ignored.
#[derive(Clone, Debug, Default)]
pub struct IgnoreList {
    patterns: Vec<Pattern>,
}

impl IgnoreList {
    pub fn new(patterns: &[String]) -> Result<IgnoreList, ScanError> {
        let patterns = patterns
            .iter()
            .map(|p| Pattern::new(p.trim_end_matches('/')))
            .collect::<Result<Vec<Pattern>, glob::PatternError>>()?;
        Ok(IgnoreList { patterns })
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> + '_ {
        self.patterns.iter().map(Pattern::as_str)
    }

    pub fn is_ignored(&self, relative_path: &str) -> bool {
        self.patterns.iter().any(|pattern| {
            pattern.matches(relative_path)
                || relative_path.split('/').any(|part| pattern.matches(part))
        })
    }
}

/// Fingerprint every regular file under `root`
///
/// Symlinks are not followed. Any unreadable entry fails the whole scan.
pub fn scan(root: &Path, ignore: &IgnoreList) -> Result<FileTree, ScanError> {
    fs::read_dir(root)
        .map_err(|source| ScanError::Unreadable { path: root.to_path_buf(), source })?;
    info!("Scanning local tree {}", root.display());

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0 || !ignore.is_ignored(&relative(root, entry.path()))
        });

    let mut tree = FileTree::new();
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let read_error = |source| ScanError::Read { path: path.to_path_buf(), source };
        let bytes = fs::read(path).map_err(read_error)?;
        let metadata = entry.metadata()?;
        let modified_time = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default();

        let relative_path = relative(root, path);
        tree.insert(relative_path.clone(), FileEntry {
            relative_path,
            fingerprint: Fingerprint::of(&bytes),
            size: bytes.len() as u64,
            modified_time,
        });
    }

    info!("Found {} local files", tree.len());
    Ok(tree)
}

fn relative(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
