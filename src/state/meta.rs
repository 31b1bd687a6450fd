/// Sidecar metadata store
///
/// One JSON record per content file, stored right next to it. Reads
/// and writes are best-effort: a missing or corrupt sidecar degrades
/// to an empty record, and a failed write degrades to a skipped write.
/// Only the scanner creates sidecars; this store never does.

use std::fs;
use std::path::Path;

use super::data::MetaRecord;
use super::scanner::meta_path_for;

/// Load the metadata record for a content file.
///
/// Missing sidecar: returns an empty record without creating one.
/// Corrupt sidecar: returns an empty record; bad metadata must never
/// take the rest of the instance down with it.
pub fn load_meta(content_path: &Path) -> MetaRecord {
    let meta_path = meta_path_for(content_path);

    let text = match fs::read_to_string(&meta_path) {
        Ok(text) => text,
        Err(_) => return MetaRecord::default(),
    };

    match serde_json::from_str(&text) {
        Ok(record) => record,
        Err(e) => {
            eprintln!("⚠️  Ignoring corrupt sidecar {}: {}", meta_path.display(), e);
            MetaRecord::default()
        }
    }
}

/// Save a full metadata record as pretty-printed JSON (2-space indent,
/// UTF-8 as-is).
///
/// Returns false without writing when the sidecar does not exist:
/// sidecar existence is scan-controlled, and a save never creates one.
/// Write failures also return false; saves are best-effort.
pub fn save_meta(content_path: &Path, record: &MetaRecord) -> bool {
    let meta_path = meta_path_for(content_path);

    if !meta_path.exists() {
        return false;
    }

    let json = match serde_json::to_string_pretty(record) {
        Ok(json) => json,
        Err(e) => {
            eprintln!(
                "⚠️  Could not serialize metadata for {}: {}",
                meta_path.display(),
                e
            );
            return false;
        }
    };

    match fs::write(&meta_path, json) {
        Ok(()) => true,
        Err(e) => {
            eprintln!("⚠️  Could not write sidecar {}: {}", meta_path.display(), e);
            false
        }
    }
}

/// Load, mutate, save: the canonical pattern behind every targeted
/// update. Fields the mutator does not touch are carried through
/// unchanged. Concurrent updates to the same file race at the
/// filesystem level; the last write wins.
pub fn update_meta<F>(content_path: &Path, mutate: F) -> bool
where
    F: FnOnce(&mut MetaRecord),
{
    let mut record = load_meta(content_path);
    mutate(&mut record);
    save_meta(content_path, &record)
}
