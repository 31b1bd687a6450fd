/// Recursive content-file discovery
///
/// Walks every sibling folder of the identity file, collects regular
/// files, and guarantees each one has a sidecar metadata file next to
/// it. Sidecar files themselves are never content.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::instance::Instance;

/// Suffix appended to a content file's full name to form its sidecar name
pub const META_SUFFIX: &str = ".ameta";

/// True for `scan.dat.ameta` and anything else carrying the sidecar suffix
pub fn is_meta_file(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().ends_with(META_SUFFIX))
        .unwrap_or(false)
}

/// Sidecar path for a content file: the full file name plus the suffix
/// (`proj1/scan.dat` -> `proj1/scan.dat.ameta`)
pub fn meta_path_for(content: &Path) -> PathBuf {
    let mut name = OsString::from(content.file_name().unwrap_or_default());
    name.push(META_SUFFIX);
    content.with_file_name(name)
}

/// Recursively walk the instance's sibling folders and return every
/// content file, sorted by path for deterministic output.
///
/// Unreadable entries are skipped rather than failing the walk, and
/// symbolic links are not followed: a link pointing back into the tree
/// must not loop the walk, and a link pointing outside must not widen it.
pub fn scan_files(instance: &Instance) -> Vec<PathBuf> {
    let mut result = Vec::new();

    for folder in &instance.sibling_folders {
        for entry in WalkDir::new(folder)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if entry.file_type().is_file() && !is_meta_file(entry.path()) {
                result.push(entry.path().to_path_buf());
            }
        }
    }

    result.sort();
    result
}

/// Create an empty `{}` sidecar for every content file that lacks one.
///
/// Idempotent: a second pass over an unchanged tree performs zero
/// writes. Returns how many sidecars were created. A sidecar that
/// cannot be written is reported and skipped; the content file stays
/// in the scan either way.
pub fn ensure_meta_files(files: &[PathBuf]) -> usize {
    let mut created = 0;

    for file in files {
        let meta_path = meta_path_for(file);
        if meta_path.exists() {
            continue;
        }

        match fs::write(&meta_path, "{}") {
            Ok(()) => created += 1,
            Err(e) => {
                eprintln!("⚠️  Could not create sidecar {}: {}", meta_path.display(), e)
            }
        }
    }

    created
}
