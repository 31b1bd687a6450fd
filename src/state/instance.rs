/// Identity resolution
///
/// An instance is anchored by its identity file: the parent directory
/// of that file is the instance root, and the directories sitting next
/// to the file are the sibling folders the scanner walks.

use std::fs;
use std::path::{Component, Path, PathBuf};

use super::StateError;

/// An opened instance: the identity file and the tree around it.
///
/// The root and the sibling-folder snapshot are fixed for the lifetime
/// of the session; pointing at a different identity file means building
/// a new `Instance`.
#[derive(Debug, Clone)]
pub struct Instance {
    /// Absolute path of the identity file
    pub identity_path: PathBuf,
    /// Parent directory of the identity file; scanning never crosses above it
    pub instance_root: PathBuf,
    /// Directories directly under the root, snapshotted at open time
    pub sibling_folders: Vec<PathBuf>,
}

impl Instance {
    /// Resolve an identity file into an instance.
    ///
    /// Fails when the path does not exist or is not a regular file.
    /// Runs once per session; there is no re-resolution.
    pub fn open(identity: &Path) -> Result<Self, StateError> {
        let identity_path = fs::canonicalize(identity)
            .map_err(|_| StateError::IdentityNotFound(identity.to_path_buf()))?;

        if !identity_path.is_file() {
            return Err(StateError::IdentityNotFound(identity_path));
        }

        let instance_root = match identity_path.parent() {
            Some(parent) => parent.to_path_buf(),
            None => return Err(StateError::IdentityNotFound(identity_path)),
        };

        // Snapshot the folders sitting next to the identity file.
        // Entries that cannot be read are skipped, and the list is
        // sorted so later scans enumerate in a stable order.
        let mut sibling_folders: Vec<PathBuf> = match fs::read_dir(&instance_root) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_dir())
                .collect(),
            Err(_) => Vec::new(),
        };
        sibling_folders.sort();

        Ok(Instance {
            identity_path,
            instance_root,
            sibling_folders,
        })
    }

    /// Relative key of an absolute path under this root: forward-slash
    /// separated, no leading slash. Returns None for paths outside the
    /// root.
    pub fn relative_key(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.instance_root).ok()?;
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }

    /// Map a relative key back to an absolute path.
    ///
    /// Keys arrive from the transport layer untrusted, so absolute
    /// paths and `..` segments are rejected rather than resolved.
    pub fn resolve(&self, key: &str) -> Option<PathBuf> {
        let rel = Path::new(key);
        if rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(self.instance_root.join(rel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_open_missing_identity() {
        let dir = tempdir().unwrap();

        let result = Instance::open(&dir.path().join("missing.db"));

        assert!(matches!(result, Err(StateError::IdentityNotFound(_))));
    }

    #[test]
    fn test_open_rejects_directory() {
        let dir = tempdir().unwrap();

        let result = Instance::open(dir.path());

        assert!(matches!(result, Err(StateError::IdentityNotFound(_))));
    }

    #[test]
    fn test_open_snapshots_sibling_folders() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("instance.db"));
        fs::create_dir(dir.path().join("beta")).unwrap();
        fs::create_dir(dir.path().join("alpha")).unwrap();
        // Loose files next to the identity are not sibling folders
        touch(&dir.path().join("notes.txt"));

        let instance = Instance::open(&dir.path().join("instance.db")).unwrap();

        let names: Vec<String> = instance
            .sibling_folders
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["alpha", "beta"]);
    }

    #[test]
    fn test_relative_key_round_trip() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("instance.db"));
        fs::create_dir_all(dir.path().join("proj1").join("b7")).unwrap();

        let instance = Instance::open(&dir.path().join("instance.db")).unwrap();

        let abs = instance.instance_root.join("proj1").join("b7").join("scan.dat");
        assert_eq!(
            instance.relative_key(&abs).unwrap(),
            "proj1/b7/scan.dat"
        );
        assert_eq!(instance.resolve("proj1/b7/scan.dat").unwrap(), abs);
    }

    #[test]
    fn test_resolve_rejects_escaping_keys() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("instance.db"));

        let instance = Instance::open(&dir.path().join("instance.db")).unwrap();

        assert!(instance.resolve("../outside.txt").is_none());
        assert!(instance.resolve("proj1/../../outside.txt").is_none());
        assert!(instance.resolve("/etc/passwd").is_none());
    }
}
