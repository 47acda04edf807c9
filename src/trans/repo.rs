//! Working-copy management for component checkouts.
//!
//! # Responsibilities
//! - Keep `<repo_root>/<project>/<component>/` in sync with the unit's
//!   upstream directory (a stand-in for a VCS checkout)
//! - Enumerate repo-relative files for statistics
//! - Resolve client-supplied filenames without escaping the working copy
//!
//! # Design Decisions
//! - Copies are refreshed by mtime/size comparison; deletions upstream are
//!   left in place (VCS checkouts behave the same between cleanups)
//! - VCS bookkeeping directories are never copied or listed

use std::fs;
use std::path::{Path, PathBuf};

use super::TransError;

const VCS_DIRS: &[&str] = &[".git", ".svn", ".hg"];

/// Refresh a working copy from its upstream directory.
///
/// Returns the number of files copied. A missing upstream is an error;
/// an empty upstream just yields an empty working copy.
pub fn refresh_working_copy(work_dir: &Path, upstream: &Path) -> Result<usize, TransError> {
    if !upstream.is_dir() {
        return Err(TransError::Checkout(format!(
            "upstream directory not found: {}",
            upstream.display()
        )));
    }
    fs::create_dir_all(work_dir)?;
    copy_tree(upstream, work_dir)
}

fn copy_tree(src: &Path, dst: &Path) -> Result<usize, TransError> {
    let mut copied = 0;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let name = entry.file_name();
        let file_type = entry.file_type()?;
        let target = dst.join(&name);

        if file_type.is_dir() {
            if VCS_DIRS.iter().any(|d| name == *d) {
                continue;
            }
            fs::create_dir_all(&target)?;
            copied += copy_tree(&entry.path(), &target)?;
        } else if file_type.is_file() && needs_copy(&entry.path(), &target)? {
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

fn needs_copy(src: &Path, dst: &Path) -> Result<bool, TransError> {
    let src_meta = fs::metadata(src)?;
    let dst_meta = match fs::metadata(dst) {
        Ok(meta) => meta,
        Err(_) => return Ok(true),
    };
    if src_meta.len() != dst_meta.len() {
        return Ok(true);
    }
    match (src_meta.modified(), dst_meta.modified()) {
        (Ok(src_time), Ok(dst_time)) => Ok(src_time > dst_time),
        _ => Ok(true),
    }
}

/// List repo-relative paths of all files under the working copy.
pub fn list_files(work_dir: &Path) -> Result<Vec<String>, TransError> {
    let mut files = Vec::new();
    if work_dir.is_dir() {
        walk(work_dir, work_dir, &mut files)?;
    }
    files.sort();
    Ok(files)
}

fn walk(root: &Path, dir: &Path, out: &mut Vec<String>) -> Result<(), TransError> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            if VCS_DIRS.iter().any(|d| name == *d) {
                continue;
            }
            walk(root, &entry.path(), out)?;
        } else if file_type.is_file() {
            let path = entry.path();
            if let Ok(rel) = path.strip_prefix(root) {
                // Repo-relative paths use forward slashes on every platform.
                let rel = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                out.push(rel);
            }
        }
    }
    Ok(())
}

/// Resolve a client-supplied repo-relative filename inside the working copy.
///
/// Absolute paths and `..` components are rejected before touching the
/// filesystem.
pub fn resolve_safe(work_dir: &Path, filename: &str) -> Result<PathBuf, TransError> {
    let candidate = Path::new(filename);
    if candidate.is_absolute() {
        return Err(TransError::BadPath(filename.to_string()));
    }
    for component in candidate.components() {
        match component {
            std::path::Component::Normal(_) => {}
            _ => return Err(TransError::BadPath(filename.to_string())),
        }
    }
    Ok(work_dir.join(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_refresh_copies_tree_and_skips_vcs_dirs() {
        let upstream = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();

        write(&upstream.path().join("po/de.po"), "msgid \"\"\nmsgstr \"\"\n");
        write(&upstream.path().join(".git/HEAD"), "ref: refs/heads/main");

        let copied = refresh_working_copy(work.path(), upstream.path()).unwrap();
        assert_eq!(copied, 1);
        assert!(work.path().join("po/de.po").is_file());
        assert!(!work.path().join(".git").exists());

        // A second refresh with nothing changed copies nothing.
        let copied = refresh_working_copy(work.path(), upstream.path()).unwrap();
        assert_eq!(copied, 0);
    }

    #[test]
    fn test_refresh_missing_upstream_fails() {
        let work = tempfile::tempdir().unwrap();
        let err = refresh_working_copy(work.path(), Path::new("/nonexistent/upstream"));
        assert!(matches!(err, Err(TransError::Checkout(_))));
    }

    #[test]
    fn test_list_files_relative_sorted() {
        let work = tempfile::tempdir().unwrap();
        write(&work.path().join("po/de.po"), "x");
        write(&work.path().join("po/ar.po"), "x");
        write(&work.path().join("README"), "x");

        let files = list_files(work.path()).unwrap();
        assert_eq!(files, vec!["README", "po/ar.po", "po/de.po"]);
    }

    #[test]
    fn test_resolve_rejects_escapes() {
        let work = Path::new("/srv/repos/p/c");
        assert!(resolve_safe(work, "po/de.po").is_ok());
        assert!(resolve_safe(work, "../secrets").is_err());
        assert!(resolve_safe(work, "/etc/passwd").is_err());
        assert!(resolve_safe(work, "po/../../x").is_err());
    }
}
