// Generation-based artifact store.
//
// Layout under the root directory:
//   CURRENT                  name of the live generation
//   gen-<seq>-<time>-<id>/   question_map.bin, food_id_map.bin, food_index.bin, manifest.json
//   .staging-<id>/           in-progress build, never read
//
// A build is written to a staging directory, renamed into place as a whole, and
// only then made live by atomically replacing CURRENT.

use crate::manifest::Manifest;
use atomicwrites::{AtomicFile, OverwriteBehavior};
use chrono::Utc;
use foodvec_core::{Error, FlatIndex, FoodIdMap, IndexBundle, QuestionMap, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

pub const CURRENT_FILE: &str = "CURRENT";
pub const QUESTION_MAP_FILE: &str = "question_map.bin";
pub const FOOD_ID_MAP_FILE: &str = "food_id_map.bin";
pub const INDEX_FILE: &str = "food_index.bin";
pub const MANIFEST_FILE: &str = "manifest.json";

const GENERATION_PREFIX: &str = "gen-";
const STAGING_PREFIX: &str = ".staging-";

/// Staging directories younger than this may belong to a running build
pub const STAGING_STALE_AFTER: Duration = Duration::from_secs(60 * 60);

/// A loaded generation: its manifest and the three artifacts
#[derive(Debug, Clone)]
pub struct Generation {
    pub manifest: Manifest,
    pub bundle: IndexBundle,
}

pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Open a store for building, creating the root directory if needed
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Open an existing store without touching the filesystem
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(Error::ArtifactLoad(format!(
                "artifact directory {:?} does not exist",
                root
            )));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn generation_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Next generation name: zero-padded sequence, build time, short random id
    fn next_generation_name(&self, id: &Uuid) -> Result<String> {
        let seq = self
            .list_generations()?
            .iter()
            .filter_map(|name| generation_sequence(name))
            .max()
            .map_or(1, |last| last + 1);
        let simple = id.simple().to_string();
        Ok(format!(
            "{}{:08}-{}-{}",
            GENERATION_PREFIX,
            seq,
            Utc::now().format("%Y%m%dT%H%M%SZ"),
            &simple[..8]
        ))
    }

    /// Write all three artifacts as a new generation and make it live
    pub fn publish(&self, bundle: &IndexBundle) -> Result<Manifest> {
        self.publish_with_id(bundle, Uuid::new_v4())
    }

    fn publish_with_id(&self, bundle: &IndexBundle, id: Uuid) -> Result<Manifest> {
        let question_map = bundle.questions().to_bytes()?;
        let food_id_map = bundle.food_ids().to_bytes()?;
        let index = bundle.index().to_bytes()?;

        let name = self.next_generation_name(&id)?;
        let manifest = Manifest::new(name.clone(), bundle, &question_map, &food_id_map, &index);

        let staging = self.root.join(format!("{}{}", STAGING_PREFIX, id.simple()));
        fs::create_dir_all(&staging)?;

        let staged = (|| -> Result<()> {
            write_synced(&staging.join(QUESTION_MAP_FILE), &question_map)?;
            write_synced(&staging.join(FOOD_ID_MAP_FILE), &food_id_map)?;
            write_synced(&staging.join(INDEX_FILE), &index)?;
            write_synced(&staging.join(MANIFEST_FILE), &manifest.to_json()?)?;
            sync_dir(&staging)?;
            fs::rename(&staging, self.generation_dir(&name))?;
            Ok(())
        })();
        if let Err(e) = staged {
            if let Err(cleanup) = fs::remove_dir_all(&staging) {
                warn!(path = ?staging, error = %cleanup, "failed to remove staging directory");
            }
            return Err(e);
        }

        sync_dir(&self.root)?;

        AtomicFile::new(self.root.join(CURRENT_FILE), OverwriteBehavior::AllowOverwrite)
            .write(|f| f.write_all(name.as_bytes()))
            .map_err(|e| Error::Storage(format!("failed to switch CURRENT: {}", e)))?;

        info!(
            generation = %name,
            dimension = manifest.dimension,
            rows = manifest.rows,
            "published artifacts"
        );
        Ok(manifest)
    }

    /// Name of the live generation, if anything has been published
    pub fn current_generation(&self) -> Result<Option<String>> {
        let path = self.root.join(CURRENT_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let name = fs::read_to_string(&path)
            .map_err(|e| Error::ArtifactLoad(format!("cannot read {}: {}", CURRENT_FILE, e)))?;
        let name = name.trim().to_string();
        check_generation_name(&name)?;
        Ok(Some(name))
    }

    /// Load the live generation
    pub fn load_current(&self) -> Result<Generation> {
        let name = self.current_generation()?.ok_or_else(|| {
            Error::ArtifactLoad(format!("no generation published under {:?}", self.root))
        })?;
        self.load_generation(&name)
    }

    /// Load and verify a specific generation
    pub fn load_generation(&self, name: &str) -> Result<Generation> {
        check_generation_name(name)?;
        let dir = self.generation_dir(name);

        let manifest = Manifest::from_json(&read_artifact(&dir, MANIFEST_FILE)?)?;
        let question_bytes = read_artifact(&dir, QUESTION_MAP_FILE)?;
        let food_bytes = read_artifact(&dir, FOOD_ID_MAP_FILE)?;
        let index_bytes = read_artifact(&dir, INDEX_FILE)?;

        Manifest::verify(&manifest.checksums.question_map, QUESTION_MAP_FILE, &question_bytes)?;
        Manifest::verify(&manifest.checksums.food_id_map, FOOD_ID_MAP_FILE, &food_bytes)?;
        Manifest::verify(&manifest.checksums.index, INDEX_FILE, &index_bytes)?;

        let bundle = IndexBundle::new(
            QuestionMap::from_bytes(&question_bytes)?,
            FoodIdMap::from_bytes(&food_bytes)?,
            FlatIndex::from_bytes(&index_bytes)?,
        )?;
        manifest.check_bundle(&bundle)?;

        Ok(Generation { manifest, bundle })
    }

    /// All published generations, oldest first
    pub fn list_generations(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if name.starts_with(GENERATION_PREFIX) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Delete all but the newest `keep` generations and staging dirs left by
    /// crashed builds.
    ///
    /// The live generation is never removed. Returns the removed names.
    pub fn prune(&self, keep: usize) -> Result<Vec<String>> {
        self.prune_with(keep, STAGING_STALE_AFTER)
    }

    /// Like [`ArtifactStore::prune`], removing only staging dirs not modified
    /// for at least `stale_after`
    pub fn prune_with(&self, keep: usize, stale_after: Duration) -> Result<Vec<String>> {
        let current = self.current_generation()?;
        let generations = self.list_generations()?;
        let cutoff = generations.len().saturating_sub(keep);

        let mut removed = Vec::new();
        for name in &generations[..cutoff] {
            if current.as_deref() == Some(name.as_str()) {
                continue;
            }
            fs::remove_dir_all(self.generation_dir(name))?;
            removed.push(name.clone());
        }

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with(STAGING_PREFIX) || !entry.file_type()?.is_dir() {
                    continue;
                }
                let stale = entry
                    .metadata()?
                    .modified()?
                    .elapsed()
                    .map_or(false, |age| age >= stale_after);
                if stale {
                    fs::remove_dir_all(entry.path())?;
                    removed.push(name.to_string());
                }
            }
        }

        if !removed.is_empty() {
            info!(count = removed.len(), "pruned artifact directories");
        }
        Ok(removed)
    }
}

fn generation_sequence(name: &str) -> Option<u64> {
    name.strip_prefix(GENERATION_PREFIX)?
        .split('-')
        .next()?
        .parse()
        .ok()
}

fn check_generation_name(name: &str) -> Result<()> {
    let valid = name.starts_with(GENERATION_PREFIX)
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.');
    if valid {
        Ok(())
    } else {
        Err(Error::ArtifactLoad(format!("invalid generation name {:?}", name)))
    }
}

fn read_artifact(dir: &Path, file: &str) -> Result<Vec<u8>> {
    fs::read(dir.join(file))
        .map_err(|e| Error::ArtifactLoad(format!("cannot read {:?}: {}", dir.join(file), e)))
}

fn write_synced(path: &Path, data: &[u8]) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data)?;
    file.sync_all()?;
    Ok(())
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}
