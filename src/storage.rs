//!
//! vitrine storage module
//! ----------------------
//! This module implements the on-disk document store using a simple two-folder
//! layout under a configured root: `profiles/<subject_id>.json` holds one
//! profile document per subject-id, and `projects/<uuid>.json` holds one
//! project document each. Documents are serialized with serde_json in the
//! camelCase wire form defined by `model`.
//!
//! Key responsibilities:
//! - Load/save of whole documents (a save unconditionally overwrites).
//! - Listing scans for ownership, favorites and the paginated feed, all
//!   ordered by creation time descending.
//! - No indexing; membership checks and scans are linear, which is the
//!   accepted mechanism at this scale.
//!
//! The public API centers around the `Store` type, which is usually wrapped in
//! a thread-safe `SharedStore` (`Arc<Mutex<Store>>`) elsewhere in the codebase.
//! Callers hold the lock across a whole load-modify-save sequence, so requests
//! within one process serialize per store. Multiple processes sharing one data
//! folder still race on load-modify-save; see DESIGN.md.

use std::{fs, path::{Path, PathBuf}};
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::model::{Profile, Project};

/// On-disk document store handle rooted at a data folder.
#[derive(Clone)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    /// Create a new Store rooted at the given filesystem path.
    /// The directory tree is created if it does not already exist.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join("profiles"))
            .with_context(|| format!("creating profiles folder under {}", root.display()))?;
        fs::create_dir_all(root.join("projects"))
            .with_context(|| format!("creating projects folder under {}", root.display()))?;
        Ok(Self { root })
    }

    /// Return the configured root folder for this Store.
    pub fn root_path(&self) -> &PathBuf { &self.root }

    // Subject-ids arrive from the identity provider and may carry prefixes
    // like `auth0|`; map anything path-hostile before using them as file names.
    fn file_key(id: &str) -> String {
        id.chars()
            .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '@') { c } else { '-' })
            .collect()
    }

    fn profile_path(&self, subject_id: &str) -> PathBuf {
        self.root.join("profiles").join(format!("{}.json", Self::file_key(subject_id)))
    }

    fn project_path(&self, id: &Uuid) -> PathBuf {
        self.root.join("projects").join(format!("{}.json", id))
    }

    pub fn get_profile(&self, subject_id: &str) -> Result<Option<Profile>> {
        let path = self.profile_path(subject_id);
        if !path.exists() { return Ok(None); }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("reading profile {}", path.display()))?;
        let profile = serde_json::from_str(&raw)
            .with_context(|| format!("parsing profile {}", path.display()))?;
        Ok(Some(profile))
    }

    pub fn save_profile(&self, profile: &Profile) -> Result<()> {
        let path = self.profile_path(&profile.subject_id);
        debug!(target: "vitrine::storage", "save_profile: subject='{}' path='{}'", profile.subject_id, path.display());
        let raw = serde_json::to_string_pretty(profile)?;
        fs::write(&path, raw)
            .with_context(|| format!("writing profile {}", path.display()))?;
        Ok(())
    }

    pub fn get_project(&self, id: &Uuid) -> Result<Option<Project>> {
        let path = self.project_path(id);
        if !path.exists() { return Ok(None); }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("reading project {}", path.display()))?;
        let project = serde_json::from_str(&raw)
            .with_context(|| format!("parsing project {}", path.display()))?;
        Ok(Some(project))
    }

    /// Persist a project document, overwriting any previous version.
    pub fn save_project(&self, project: &Project) -> Result<()> {
        let path = self.project_path(&project.id);
        debug!(target: "vitrine::storage", "save_project: id='{}' path='{}'", project.id, path.display());
        let raw = serde_json::to_string_pretty(project)?;
        fs::write(&path, raw)
            .with_context(|| format!("writing project {}", path.display()))?;
        Ok(())
    }

    pub fn delete_project(&self, id: &Uuid) -> Result<()> {
        let path = self.project_path(id);
        debug!(target: "vitrine::storage", "delete_project: id='{}'", id);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("deleting project {}", path.display()))?;
        }
        Ok(())
    }

    /// Load every project document under the root, newest first. Unparsable
    /// files are skipped with a debug log rather than failing the scan.
    fn load_all_projects(&self) -> Result<Vec<Project>> {
        let dir = self.root.join("projects");
        let mut out: Vec<Project> = Vec::new();
        for entry in fs::read_dir(&dir)
            .with_context(|| format!("listing projects under {}", dir.display()))?
        {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") { continue; }
            let raw = match fs::read_to_string(&path) {
                Ok(r) => r,
                Err(e) => {
                    debug!(target: "vitrine::storage", "skipping unreadable file '{}': {}", path.display(), e);
                    continue;
                }
            };
            match serde_json::from_str::<Project>(&raw) {
                Ok(p) => out.push(p),
                Err(e) => {
                    debug!(target: "vitrine::storage", "skipping unparsable file '{}': {}", path.display(), e);
                }
            }
        }
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    pub fn find_by_owner(&self, subject_id: &str) -> Result<Vec<Project>> {
        let mut all = self.load_all_projects()?;
        all.retain(|p| p.owner_id == subject_id);
        Ok(all)
    }

    pub fn find_by_favorited(&self, subject_id: &str) -> Result<Vec<Project>> {
        let mut all = self.load_all_projects()?;
        all.retain(|p| p.favorited_by.iter().any(|s| s == subject_id));
        Ok(all)
    }

    /// Return one page of the feed plus the total project count, ordered by
    /// creation time descending.
    pub fn find_page(&self, offset: usize, limit: usize) -> Result<(Vec<Project>, usize)> {
        let all = self.load_all_projects()?;
        let total = all.len();
        let page = all.into_iter().skip(offset).take(limit).collect();
        Ok((page, total))
    }
}

/// Thread-safe handle shared across handlers. Lock once per operation and
/// hold the guard across the whole load-modify-save sequence.
#[derive(Clone)]
pub struct SharedStore(pub Arc<Mutex<Store>>);

impl SharedStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        Ok(Self(Arc::new(Mutex::new(Store::new(root)?))))
    }
}
