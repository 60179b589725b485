//! Log sources from a debug bundle
//!
//! A debug bundle lays out one directory per node:
//!
//! ```text
//! <bundle>/nodes/<node>/logs/*.log
//! ```
//!
//! Sources are returned in a stable order (node directory, then file name)
//! so discovery order, and therefore tie-breaking in rankings, does not
//! depend on directory listing order.

use crate::error::{SourceError, TriageError};
use std::fs;
use std::path::{Path, PathBuf};

/// Anything that yields numbered lines under an opaque identifier
pub trait LineSource {
    /// Opaque identifier carried into every trace
    fn id(&self) -> &str;

    /// Node the source belongs to, for per-node reporting
    fn node(&self) -> &str;

    /// All lines with 1-based line numbers
    fn read_lines(&self) -> Result<Vec<(usize, String)>, SourceError>;
}

/// A `.log` file inside a node's log directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFile {
    pub node: String,
    pub path: PathBuf,
    id: String,
}

impl LogFile {
    pub fn new(node: impl Into<String>, path: PathBuf) -> Self {
        let id = path.display().to_string();
        Self {
            node: node.into(),
            path,
            id,
        }
    }
}

impl LineSource for LogFile {
    fn id(&self) -> &str {
        &self.id
    }

    fn node(&self) -> &str {
        &self.node
    }

    fn read_lines(&self) -> Result<Vec<(usize, String)>, SourceError> {
        let bytes = fs::read(&self.path).map_err(|e| SourceError {
            source_id: self.id.clone(),
            reason: e.to_string(),
        })?;
        // Undecodable bytes are replaced rather than failing the source.
        let text = String::from_utf8_lossy(&bytes);
        Ok(text
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.to_string()))
            .collect())
    }
}

/// In-memory text, for tests and piped input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSource {
    pub id: String,
    pub node: String,
    pub text: String,
}

impl LineSource for TextSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn node(&self) -> &str {
        &self.node
    }

    fn read_lines(&self) -> Result<Vec<(usize, String)>, SourceError> {
        Ok(crate::segment::numbered_lines(&self.text).collect())
    }
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?;
    entries.sort();
    Ok(entries)
}

/// Find every `nodes/*/logs/*.log` file in a debug bundle
///
/// A node whose `logs/` directory cannot be listed is skipped with a
/// warning; only a missing or unreadable `nodes/` directory is fatal.
pub fn find_log_files(bundle: &Path) -> Result<Vec<LogFile>, TriageError> {
    collect_log_files(bundle, sorted_entries)
}

fn collect_log_files<L>(bundle: &Path, list: L) -> Result<Vec<LogFile>, TriageError>
where
    L: Fn(&Path) -> Result<Vec<PathBuf>, std::io::Error>,
{
    let nodes_dir = bundle.join("nodes");
    if !nodes_dir.is_dir() {
        return Err(TriageError::MissingNodesDir(bundle.to_path_buf()));
    }

    let mut files = Vec::new();
    for node_path in list(&nodes_dir)? {
        if !node_path.is_dir() {
            continue;
        }
        let logs_dir = node_path.join("logs");
        if !logs_dir.is_dir() {
            tracing::debug!(node = %node_path.display(), "node has no logs directory");
            continue;
        }
        let entries = match list(&logs_dir) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(dir = %logs_dir.display(), "skipping unreadable logs directory: {}", err);
                continue;
            }
        };
        let node = node_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        for path in entries {
            if path.is_file() && path.extension().is_some_and(|ext| ext == "log") {
                files.push(LogFile::new(node.clone(), path));
            }
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_missing_nodes_dir() {
        let dir = TempDir::new().unwrap();
        let err = find_log_files(dir.path()).unwrap_err();
        assert!(matches!(err, TriageError::MissingNodesDir(_)));
    }

    #[test]
    fn test_finds_log_files_in_stable_order() {
        let dir = TempDir::new().unwrap();
        let nodes = dir.path().join("nodes");
        touch(&nodes.join("2/logs/cockroach.log"), "b");
        touch(&nodes.join("1/logs/cockroach.log"), "a");
        touch(&nodes.join("1/logs/cockroach-stderr.log"), "a");
        touch(&nodes.join("1/logs/notes.txt"), "x");
        touch(&nodes.join("3/other/cockroach.log"), "x");
        touch(&nodes.join("stray.log"), "x");

        let files = find_log_files(dir.path()).unwrap();
        let found: Vec<(String, String)> = files
            .iter()
            .map(|f| {
                (
                    f.node.clone(),
                    f.path.file_name().unwrap().to_string_lossy().into_owned(),
                )
            })
            .collect();
        assert_eq!(
            found,
            vec![
                ("1".to_string(), "cockroach-stderr.log".to_string()),
                ("1".to_string(), "cockroach.log".to_string()),
                ("2".to_string(), "cockroach.log".to_string()),
            ]
        );
    }

    #[test]
    fn test_read_lines_is_lossy_and_numbered() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("n.log");
        fs::write(&path, b"first\nsec\xffond\nthird\n").unwrap();
        let lines = LogFile::new("1", path).read_lines().unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], (1, "first".to_string()));
        assert!(lines[1].1.starts_with("sec"));
        assert_eq!(lines[2].0, 3);
    }

    #[test]
    fn test_unreadable_source_is_error() {
        let source = LogFile::new("1", PathBuf::from("/nonexistent/definitely/missing.log"));
        let err = source.read_lines().unwrap_err();
        assert!(err.source_id.contains("missing.log"));
    }

    #[test]
    fn test_unlistable_logs_dir_skips_node() {
        let dir = TempDir::new().unwrap();
        let nodes = dir.path().join("nodes");
        touch(&nodes.join("1/logs/cockroach.log"), "a");
        touch(&nodes.join("2/logs/cockroach.log"), "b");
        let broken = nodes.join("1").join("logs");

        let files = collect_log_files(dir.path(), |path| {
            if path == broken {
                Err(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "permission denied",
                ))
            } else {
                sorted_entries(path)
            }
        })
        .unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].node, "2");
    }
}
