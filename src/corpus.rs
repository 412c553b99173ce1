//! Facilities for discovering input files and loading byte corpora.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Result, UbpeError};

/// How discovered files are turned into training documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentMode {
    /// Every file becomes one document.
    WholeFile,
    /// Every non-empty line becomes one document.
    #[default]
    Lines,
}

/// Configuration controlling corpus discovery and loading.
#[derive(Debug, Clone, Default)]
pub struct CorpusOptions {
    /// Document granularity.
    pub mode: DocumentMode,
    /// Enables recursive directory traversal.
    pub recursive: bool,
    /// Follows symlinks encountered during traversal.
    pub follow_symlinks: bool,
}

/// Discovers files rooted at the provided input paths.
///
/// Directories are walked according to [`CorpusOptions::recursive`] and
/// [`CorpusOptions::follow_symlinks`]; the result is sorted so corpus order
/// does not depend on directory iteration order.
pub fn collect_paths<P: AsRef<Path>>(inputs: &[P], opts: &CorpusOptions) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        let path = input.as_ref();
        if !path.exists() {
            return Err(UbpeError::precondition(format!(
                "input path {path:?} does not exist"
            )));
        }
        let metadata = path
            .symlink_metadata()
            .map_err(|err| UbpeError::io(err, Some(path.to_path_buf())))?;
        if metadata.is_dir() {
            if opts.recursive {
                let walker = WalkDir::new(path).follow_links(opts.follow_symlinks);
                for entry in walker {
                    let entry = entry.map_err(|err| {
                        UbpeError::precondition(format!("walking {path:?} failed: {err}"))
                    })?;
                    if entry.file_type().is_file() {
                        files.push(entry.path().to_path_buf());
                    }
                }
            } else {
                for entry in fs::read_dir(path)
                    .map_err(|err| UbpeError::io(err, Some(path.to_path_buf())))?
                {
                    let entry =
                        entry.map_err(|err| UbpeError::io(err, Some(path.to_path_buf())))?;
                    let entry_path = entry.path();
                    if entry_path.is_file() {
                        files.push(entry_path);
                    }
                }
            }
        } else if metadata.is_file() {
            files.push(path.to_path_buf());
        }
    }
    if files.is_empty() {
        return Err(UbpeError::precondition(
            "no files discovered in provided inputs",
        ));
    }
    files.sort();
    Ok(files)
}

/// Loads the corpus as byte documents according to the document mode.
///
/// Empty documents are discarded to avoid degenerate training input.
pub fn load_corpus<P: AsRef<Path>>(inputs: &[P], opts: &CorpusOptions) -> Result<Vec<Vec<u8>>> {
    let file_paths = collect_paths(inputs, opts)?;
    let mut documents = Vec::new();
    for file_path in file_paths {
        let bytes =
            fs::read(&file_path).map_err(|err| UbpeError::io(err, Some(file_path.clone())))?;
        match opts.mode {
            DocumentMode::WholeFile => {
                if !bytes.is_empty() {
                    documents.push(bytes);
                }
            }
            DocumentMode::Lines => {
                for line in bytes.split(|&byte| byte == b'\n') {
                    if !line.is_empty() {
                        documents.push(line.to_vec());
                    }
                }
            }
        }
    }
    if documents.is_empty() {
        return Err(UbpeError::precondition(
            "no documents could be loaded from inputs",
        ));
    }
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn collect_paths_discovers_files_recursively() {
        let dir = tempdir().expect("tempdir");
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).expect("create nested directory");
        let file_a = dir.path().join("a.txt");
        let file_b = nested.join("b.txt");
        fs::write(&file_a, b"one").expect("write a");
        fs::write(&file_b, b"two").expect("write b");

        let opts = CorpusOptions {
            recursive: true,
            ..CorpusOptions::default()
        };
        let paths = collect_paths(&[dir.path()], &opts).expect("collect paths");
        assert_eq!(paths, vec![file_a, file_b]);
    }

    #[test]
    fn collect_paths_rejects_missing_inputs() {
        let dir = tempdir().expect("tempdir");
        let missing = dir.path().join("absent");
        assert!(matches!(
            collect_paths(&[missing], &CorpusOptions::default()),
            Err(UbpeError::Precondition(_))
        ));
    }

    #[test]
    fn line_mode_splits_and_drops_empty_lines() {
        let dir = tempdir().expect("tempdir");
        let file = dir.path().join("data.txt");
        fs::write(&file, b"ab\n\ncd\n").expect("write data");

        let documents = load_corpus(&[file], &CorpusOptions::default()).expect("load corpus");
        assert_eq!(documents, vec![b"ab".to_vec(), b"cd".to_vec()]);
    }

    #[test]
    fn whole_file_mode_keeps_files_intact() {
        let dir = tempdir().expect("tempdir");
        let file = dir.path().join("data.bin");
        fs::write(&file, [0u8, 10, 20]).expect("write data");

        let opts = CorpusOptions {
            mode: DocumentMode::WholeFile,
            ..CorpusOptions::default()
        };
        let documents = load_corpus(&[file], &opts).expect("load corpus");
        assert_eq!(documents, vec![vec![0u8, 10, 20]]);
    }
}
