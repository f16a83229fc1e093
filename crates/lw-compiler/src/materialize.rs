//! Output directory creation.
//!
//! Runs once at startup, before the first compile. Every missing ancestor
//! of every output file is created (`mkdir -p` semantics); an ancestor that
//! exists as anything other than a directory is a [`MaterializeError::PathConflict`].
//!
//! All ancestors are inspected before anything is created, so a conflict
//! leaves the filesystem untouched.

use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use lw_core::CompileMapping;
use rustc_hash::FxHashSet;
use tracing::{debug, info};

use crate::error::MaterializeError;

/// Creates the missing parent directories of every mapping's output.
///
/// Returns the directories that were created, outermost first. Symlinks to
/// directories count as directories.
///
/// # Errors
///
/// Returns [`MaterializeError::PathConflict`] if an ancestor exists but is
/// not a directory, or [`MaterializeError::Io`] if inspecting or creating a
/// directory fails.
///
/// # Examples
///
/// ```no_run
/// use camino::Utf8Path;
/// use lw_compiler::materialize_output_dirs;
/// use lw_core::CompileMapping;
///
/// let mappings = vec![CompileMapping::new("main.less", "css/out/main.css")];
/// let created = materialize_output_dirs(Utf8Path::new("/srv/styles"), &mappings)?;
/// println!("created {created:?}");
/// # Ok::<(), lw_compiler::MaterializeError>(())
/// ```
pub fn materialize_output_dirs(
    root: &Utf8Path,
    mappings: &[CompileMapping],
) -> Result<Vec<Utf8PathBuf>, MaterializeError> {
    let mut missing = Vec::new();
    let mut visited: FxHashSet<Utf8PathBuf> = FxHashSet::default();

    for mapping in mappings {
        let output = mapping.output_in(root);
        let Some(parent) = output.parent() else {
            continue;
        };

        for dir in parent.ancestors() {
            if dir.as_str().is_empty() || visited.contains(dir) {
                break;
            }
            match fs::metadata(dir) {
                Ok(meta) if meta.is_dir() => {
                    visited.insert(dir.to_owned());
                    break;
                }
                Ok(_) => {
                    return Err(MaterializeError::PathConflict {
                        path: dir.to_owned(),
                    });
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
                    ) =>
                {
                    visited.insert(dir.to_owned());
                    missing.push(dir.to_owned());
                }
                Err(source) => {
                    return Err(MaterializeError::Io {
                        path: dir.to_owned(),
                        source,
                    });
                }
            }
        }
    }

    // Parents first.
    missing.sort_by_key(|dir| dir.components().count());

    for dir in &missing {
        match fs::create_dir(dir) {
            Ok(()) => info!(path = %dir, "Created output directory"),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => {
                debug!(path = %dir, "Output directory appeared concurrently");
            }
            Err(source) => {
                return Err(MaterializeError::Io {
                    path: dir.clone(),
                    source,
                });
            }
        }
    }

    Ok(missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_root() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("non-UTF-8 temp dir");
        (dir, root)
    }

    #[test]
    fn test_creates_missing_chain_outermost_first() {
        let (_dir, root) = temp_root();
        let mappings = vec![CompileMapping::new("main.less", "a/b/c/main.css")];

        let created = materialize_output_dirs(&root, &mappings).unwrap();

        assert_eq!(
            created,
            vec![root.join("a"), root.join("a/b"), root.join("a/b/c")]
        );
        assert!(root.join("a/b/c").is_dir());
    }

    #[test]
    fn test_only_missing_ancestors_are_created() {
        let (_dir, root) = temp_root();
        fs::create_dir_all(root.join("css/old")).unwrap();
        fs::write(root.join("css/old/keep.css"), "x").unwrap();

        let mappings = vec![
            CompileMapping::new("a.less", "css/new/a.css"),
            CompileMapping::new("b.less", "css/new/b.css"),
            CompileMapping::new("c.less", "css/old/c.css"),
        ];
        let created = materialize_output_dirs(&root, &mappings).unwrap();

        assert_eq!(created, vec![root.join("css/new")]);
        assert_eq!(fs::read_to_string(root.join("css/old/keep.css")).unwrap(), "x");
    }

    #[test]
    fn test_output_in_root_needs_nothing() {
        let (_dir, root) = temp_root();
        let created = materialize_output_dirs(&root, &[CompileMapping::default()]).unwrap();
        assert!(created.is_empty());
    }

    #[test]
    fn test_idempotent() {
        let (_dir, root) = temp_root();
        let mappings = vec![CompileMapping::new("main.less", "out/main.css")];

        assert_eq!(materialize_output_dirs(&root, &mappings).unwrap().len(), 1);
        assert!(materialize_output_dirs(&root, &mappings).unwrap().is_empty());
    }

    #[test]
    fn test_file_parent_is_conflict() {
        let (_dir, root) = temp_root();
        fs::write(root.join("css"), "not a directory").unwrap();

        let mappings = vec![CompileMapping::new("main.less", "css/main.css")];
        let err = materialize_output_dirs(&root, &mappings).unwrap_err();

        assert!(matches!(err, MaterializeError::PathConflict { .. }));
        assert_eq!(err.path(), &root.join("css"));
    }

    #[test]
    fn test_file_grandparent_is_conflict_and_nothing_is_created() {
        let (_dir, root) = temp_root();
        fs::write(root.join("css"), "not a directory").unwrap();

        let mappings = vec![
            CompileMapping::new("a.less", "fresh/a.css"),
            CompileMapping::new("b.less", "css/deep/b.css"),
        ];
        let err = materialize_output_dirs(&root, &mappings).unwrap_err();

        assert_eq!(err.path(), &root.join("css"));
        assert!(!root.join("fresh").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directory_is_accepted() {
        let (_dir, root) = temp_root();
        fs::create_dir(root.join("real")).unwrap();
        std::os::unix::fs::symlink(root.join("real"), root.join("link")).unwrap();

        let mappings = vec![CompileMapping::new("main.less", "link/main.css")];
        assert!(materialize_output_dirs(&root, &mappings).unwrap().is_empty());
    }
}
