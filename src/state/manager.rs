/// Instance state manager
///
/// Composes identity resolution, scanning, sidecar metadata, and the
/// column schema into the one session object the transport layer talks
/// to. Built once at startup and shared by reference: every operation
/// takes `&self` and opens whatever it needs for just that call, so
/// concurrent request handlers never contend on a shared handle.

use std::path::Path;

use super::data::{AnnotationColumn, FileEntry, MetaRecord, ScanResult};
use super::instance::Instance;
use super::meta;
use super::scanner;
use super::schema::SchemaStore;
use super::StateError;

pub struct InstanceState {
    instance: Instance,
    schema: SchemaStore,
}

impl InstanceState {
    /// Open a session: resolve the identity file, bring up the schema
    /// store inside it, and run the initial scan so every content file
    /// has a sidecar before the first request arrives.
    pub fn open(identity: &Path) -> Result<Self, StateError> {
        let instance = Instance::open(identity)?;
        let schema = SchemaStore::open(&instance.identity_path)?;
        let state = InstanceState { instance, schema };

        let files = state.scan();
        println!(
            "📂 Instance opened at {} ({} files)",
            state.instance.instance_root.display(),
            files.len()
        );

        Ok(state)
    }

    /// The resolved instance: identity path, root, sibling folders
    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    /// Enumerate all content files, sorted by relative key.
    ///
    /// Side effect: any content file missing its sidecar gets an empty
    /// one. Re-running on an unchanged tree returns the same list and
    /// writes nothing. The list is transient; nothing is cached between
    /// calls, so a scan always reflects the tree as it is now.
    pub fn scan(&self) -> Vec<String> {
        let files = scanner::scan_files(&self.instance);

        let created = scanner::ensure_meta_files(&files);
        if created > 0 {
            println!("📝 Created {} empty sidecar(s)", created);
        }

        files
            .iter()
            .filter_map(|p| self.instance.relative_key(p))
            .collect()
    }

    // ========== Sidecar metadata ==========

    /// Metadata record for a relative key; empty record when the key
    /// has no sidecar, a corrupt one, or points outside the tree.
    pub fn load_meta(&self, key: &str) -> MetaRecord {
        match self.instance.resolve(key) {
            Some(path) => meta::load_meta(&path),
            None => MetaRecord::default(),
        }
    }

    /// Replace the full metadata record. Best-effort: false means the
    /// write did not happen (escaping key, missing sidecar, or IO
    /// failure).
    pub fn save_meta(&self, key: &str, record: &MetaRecord) -> bool {
        match self.instance.resolve(key) {
            Some(path) => meta::save_meta(&path, record),
            None => false,
        }
    }

    /// Set the display-name override
    pub fn update_name(&self, key: &str, value: &str) -> bool {
        self.update(key, |record| {
            record.name = Some(value.to_string());
        })
    }

    /// Set one annotation value by column id
    pub fn update_annotation(&self, key: &str, column_id: &str, value: &str) -> bool {
        let column_id = column_id.to_string();
        self.update(key, |record| {
            record.annotations.insert(column_id, value.to_string());
        })
    }

    /// Set (`Some`) or clear (`None`) the thumbnail reference
    pub fn update_thumbnail(&self, key: &str, value: Option<&str>) -> bool {
        self.update(key, |record| {
            record.thumbnail = value.map(str::to_string);
        })
    }

    fn update<F>(&self, key: &str, mutate: F) -> bool
    where
        F: FnOnce(&mut MetaRecord),
    {
        match self.instance.resolve(key) {
            Some(path) => meta::update_meta(&path, mutate),
            None => false,
        }
    }

    // ========== Column schema ==========

    pub fn category_columns(&self) -> Result<Vec<String>, StateError> {
        self.schema.category_columns()
    }

    pub fn add_category_column(&self, name: &str) -> Result<(), StateError> {
        self.schema.add_category_column(name)
    }

    pub fn remove_category_column(&self, name: &str) -> Result<(), StateError> {
        self.schema.remove_category_column(name)
    }

    pub fn annotation_columns(&self) -> Result<Vec<AnnotationColumn>, StateError> {
        self.schema.annotation_columns()
    }

    pub fn add_annotation_column(&self, id: &str, label: &str) -> Result<bool, StateError> {
        self.schema.add_annotation_column(id, label)
    }

    pub fn remove_annotation_column(&self, id: &str) -> Result<(), StateError> {
        self.schema.remove_annotation_column(id)
    }

    // ========== Derived views ==========

    /// Positional category values for a relative key: the i-th category
    /// column takes the i-th folder segment of the path. Files nested
    /// shallower than the column count project "" for the tail; extra
    /// folder segments beyond the column count are ignored.
    pub fn project_categories(&self, key: &str) -> Result<Vec<String>, StateError> {
        let columns = self.schema.category_columns()?;
        Ok(category_values(key, columns.len()))
    }

    /// Annotation values for a relative key, in column order, "" when
    /// the sidecar holds no value for a column.
    pub fn project_annotations(&self, key: &str) -> Result<Vec<String>, StateError> {
        let columns = self.schema.annotation_columns()?;
        Ok(annotation_values(&self.load_meta(key), &columns))
    }

    /// The full table the transport serves: one row per content file
    /// with display name, thumbnail, and both projections, plus the
    /// column vocabulary. Recomputed from disk on every call; reading
    /// it never mutates the stores (beyond the scan's sidecar
    /// creation).
    pub fn entries(&self) -> Result<ScanResult, StateError> {
        let category_columns = self.schema.category_columns()?;
        let annotation_columns = self.schema.annotation_columns()?;

        let files = self
            .scan()
            .into_iter()
            .map(|key| {
                let record = self.load_meta(&key);
                FileEntry {
                    name: display_name(&key, &record),
                    thumbnail: record.thumbnail.clone(),
                    categories: category_values(&key, category_columns.len()),
                    annotations: annotation_values(&record, &annotation_columns),
                    path: key,
                }
            })
            .collect();

        Ok(ScanResult {
            files,
            category_columns,
            annotation_columns,
        })
    }
}

/// Display name: the sidecar override when set and non-empty, else the
/// file stem
fn display_name(key: &str, record: &MetaRecord) -> String {
    match &record.name {
        Some(name) if !name.is_empty() => name.clone(),
        _ => file_stem(key),
    }
}

/// File stem of a relative key (`proj1/b7/scan.dat` -> `scan`).
/// Dotfiles keep their full name.
fn file_stem(key: &str) -> String {
    let file_name = key.rsplit('/').next().unwrap_or(key);
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => file_name.to_string(),
    }
}

/// Folder segments of a relative key (everything but the file name),
/// padded or truncated to the column count
fn category_values(key: &str, column_count: usize) -> Vec<String> {
    let mut segments: Vec<&str> = key.split('/').collect();
    segments.pop(); // the file name is not a category

    (0..column_count)
        .map(|i| segments.get(i).map(|s| s.to_string()).unwrap_or_default())
        .collect()
}

fn annotation_values(record: &MetaRecord, columns: &[AnnotationColumn]) -> Vec<String> {
    columns
        .iter()
        .map(|c| record.annotations.get(&c.id).cloned().unwrap_or_default())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    /// The example tree from the projection contract:
    /// an identity file, `proj1/b7/scan.dat`, and `onlyone/scan.dat`
    fn open_sample() -> (tempfile::TempDir, InstanceState) {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("instance.db"), b"").unwrap();
        fs::create_dir_all(dir.path().join("proj1").join("b7")).unwrap();
        fs::create_dir(dir.path().join("onlyone")).unwrap();
        fs::write(dir.path().join("proj1").join("b7").join("scan.dat"), b"x").unwrap();
        fs::write(dir.path().join("onlyone").join("scan.dat"), b"x").unwrap();

        let state = InstanceState::open(&dir.path().join("instance.db")).unwrap();
        (dir, state)
    }

    #[test]
    fn test_open_fails_for_missing_identity() {
        let dir = tempdir().unwrap();

        let result = InstanceState::open(&dir.path().join("missing.db"));

        assert!(matches!(result, Err(StateError::IdentityNotFound(_))));
    }

    #[test]
    fn test_open_creates_sidecars_and_scan_is_idempotent() {
        let (_dir, state) = open_sample();

        let root = state.instance().instance_root.clone();
        let sidecar = root.join("proj1").join("b7").join("scan.dat.ameta");
        assert_eq!(fs::read_to_string(&sidecar).unwrap(), "{}");

        let first = state.scan();
        let second = state.scan();
        assert_eq!(first, second);
        assert_eq!(first, ["onlyone/scan.dat", "proj1/b7/scan.dat"]);
    }

    #[test]
    fn test_category_projection_pads_and_truncates() {
        let (_dir, state) = open_sample();
        state.add_category_column("project").unwrap();
        state.add_category_column("batch").unwrap();

        assert_eq!(
            state.project_categories("proj1/b7/scan.dat").unwrap(),
            ["proj1", "b7"]
        );
        // Shallower than the column count: trailing columns are empty
        assert_eq!(
            state.project_categories("onlyone/scan.dat").unwrap(),
            ["onlyone", ""]
        );

        // Deeper than the column count: extra segments are ignored
        state.remove_category_column("batch").unwrap();
        assert_eq!(
            state.project_categories("proj1/b7/scan.dat").unwrap(),
            ["proj1"]
        );
    }

    #[test]
    fn test_annotation_projection_defaults_to_empty() {
        let (_dir, state) = open_sample();
        state.add_annotation_column("status", "Status").unwrap();

        assert!(state.update_annotation("proj1/b7/scan.dat", "status", "done"));

        assert_eq!(
            state.project_annotations("proj1/b7/scan.dat").unwrap(),
            ["done"]
        );
        // The untouched file still has its empty `{}` record
        assert_eq!(
            state.project_annotations("onlyone/scan.dat").unwrap(),
            [""]
        );
    }

    #[test]
    fn test_meta_round_trip_through_keys() {
        let (_dir, state) = open_sample();

        let mut record = state.load_meta("proj1/b7/scan.dat");
        record.name = Some("Calibration run".to_string());
        assert!(state.save_meta("proj1/b7/scan.dat", &record));

        let loaded = state.load_meta("proj1/b7/scan.dat");
        assert_eq!(loaded.name.as_deref(), Some("Calibration run"));
    }

    #[test]
    fn test_updates_outside_tree_are_rejected() {
        let (_dir, state) = open_sample();

        assert!(!state.update_name("../escape.txt", "nope"));
        assert!(state.load_meta("../escape.txt") == MetaRecord::default());
    }

    #[test]
    fn test_entries_compose_names_thumbnails_and_projections() {
        let (_dir, state) = open_sample();
        state.add_category_column("project").unwrap();
        state.add_annotation_column("status", "Status").unwrap();

        state.update_name("onlyone/scan.dat", "First light");
        state.update_thumbnail("onlyone/scan.dat", Some("data:image/png;base64,AAAA"));
        state.update_annotation("proj1/b7/scan.dat", "status", "done");

        let result = state.entries().unwrap();
        assert_eq!(result.category_columns, ["project"]);
        assert_eq!(result.annotation_columns[0].label, "Status");

        let first = &result.files[0];
        assert_eq!(first.path, "onlyone/scan.dat");
        assert_eq!(first.name, "First light");
        assert_eq!(first.thumbnail.as_deref(), Some("data:image/png;base64,AAAA"));
        assert_eq!(first.categories, ["onlyone"]);
        assert_eq!(first.annotations, [""]);

        let second = &result.files[1];
        // No name override: the display name falls back to the stem
        assert_eq!(second.name, "scan");
        assert_eq!(second.categories, ["proj1"]);
        assert_eq!(second.annotations, ["done"]);
    }

    #[test]
    fn test_delete_thumbnail_clears_field() {
        let (_dir, state) = open_sample();

        state.update_thumbnail("onlyone/scan.dat", Some("data:..."));
        assert!(state.load_meta("onlyone/scan.dat").thumbnail.is_some());

        state.update_thumbnail("onlyone/scan.dat", None);
        assert!(state.load_meta("onlyone/scan.dat").thumbnail.is_none());

        // The cleared field disappears from the sidecar entirely
        let sidecar = state
            .instance()
            .instance_root
            .join("onlyone")
            .join("scan.dat.ameta");
        assert_eq!(fs::read_to_string(sidecar).unwrap(), "{}");
    }
}
