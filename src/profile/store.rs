//! Encrypted, cached, file-backed profile store.
//!
//! All profiles live in one JSON document (`profiles.json`). Reads go through
//! an in-memory cache that is reused while the file's modification time is
//! unchanged. Every mutation rewrites the whole document, re-encrypting each
//! URI, into a temporary file that is then renamed over the original, so the
//! file is never observed half-written.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::Utc;
use tokio::fs;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::model::{
    ConnectionProfile, MetadataUpdate, ProfileStorage, ProfileUpdate, STORAGE_VERSION,
    StoredProfile,
};
use super::validate::validate_profile;
use crate::config::Config;
use crate::crypto::UriCipher;
use crate::error::{MprofError, Result};
use crate::utils::restrict_file_permissions;

#[derive(Debug, Default)]
struct ProfileCache {
    profiles: BTreeMap<String, ConnectionProfile>,
    /// Entries on disk that could not be decrypted. Written back verbatim.
    undecryptable: Vec<StoredProfile>,
    modified: Option<SystemTime>,
    disk_loads: u64,
}

/// Durable CRUD over [`ConnectionProfile`] with transparent URI encryption.
#[derive(Debug)]
pub struct ProfileStore {
    path: PathBuf,
    cipher: UriCipher,
    cache: Mutex<ProfileCache>,
}

impl ProfileStore {
    /// Create a store backed by `path`. Nothing is read until first use.
    pub fn new(path: PathBuf, cipher: UriCipher) -> Self {
        Self {
            path,
            cipher,
            cache: Mutex::new(ProfileCache::default()),
        }
    }

    /// Create a store at the configured location with the configured secret.
    pub fn open(config: &Config) -> Self {
        Self::new(config.profiles_path(), config.cipher())
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// How many times the file has been read and decrypted. Cache hits do
    /// not count.
    pub async fn disk_loads(&self) -> u64 {
        self.cache.lock().await.disk_loads
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// All profiles, ordered by name.
    pub async fn list(&self) -> Result<Vec<ConnectionProfile>> {
        let mut cache = self.cache.lock().await;
        self.load_locked(&mut cache).await?;
        Ok(cache.profiles.values().cloned().collect())
    }

    /// Look up one profile by name.
    pub async fn get(&self, name: &str) -> Result<Option<ConnectionProfile>> {
        let mut cache = self.cache.lock().await;
        self.load_locked(&mut cache).await?;
        Ok(cache.profiles.get(name).cloned())
    }

    /// The profile marked as default, if any.
    pub async fn get_default(&self) -> Result<Option<ConnectionProfile>> {
        let mut cache = self.cache.lock().await;
        self.load_locked(&mut cache).await?;
        Ok(cache.profiles.values().find(|p| p.is_default()).cloned())
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Add a new profile. Fails with `DuplicateName` if the name is taken.
    /// `createdAt` is stamped with the current time.
    pub async fn add(&self, mut profile: ConnectionProfile) -> Result<()> {
        validate_profile(&profile)?;

        let mut cache = self.cache.lock().await;
        self.load_locked(&mut cache).await?;

        if cache.profiles.contains_key(&profile.name) {
            return Err(MprofError::DuplicateName(profile.name));
        }

        profile.metadata.created_at = Utc::now();
        let mut profiles = cache.profiles.clone();
        if profile.is_default() {
            clear_default(&mut profiles);
        }
        tracing::debug!(profile = %profile.name, "adding profile");
        profiles.insert(profile.name.clone(), profile);

        self.persist_locked(&mut cache, profiles).await
    }

    /// Remove a profile. Returns whether it existed; the file is only
    /// rewritten when something was removed.
    pub async fn remove(&self, name: &str) -> Result<bool> {
        let mut cache = self.cache.lock().await;
        self.load_locked(&mut cache).await?;

        if !cache.profiles.contains_key(name) {
            return Ok(false);
        }

        let mut profiles = cache.profiles.clone();
        profiles.remove(name);
        tracing::debug!(profile = %name, "removing profile");
        self.persist_locked(&mut cache, profiles).await?;
        Ok(true)
    }

    /// Merge `changes` into an existing profile. Returns `false` if there is
    /// no profile with this name.
    pub async fn update(&self, name: &str, changes: ProfileUpdate) -> Result<bool> {
        let mut cache = self.cache.lock().await;
        self.load_locked(&mut cache).await?;

        let Some(existing) = cache.profiles.get(name) else {
            return Ok(false);
        };

        let mut updated = existing.clone();
        let becomes_default = changes
            .metadata
            .as_ref()
            .and_then(|m| m.is_default)
            .unwrap_or(false);
        changes.apply_to(&mut updated);
        validate_profile(&updated)?;

        let mut profiles = cache.profiles.clone();
        if becomes_default {
            clear_default(&mut profiles);
        }
        profiles.insert(name.to_string(), updated);

        self.persist_locked(&mut cache, profiles).await?;
        Ok(true)
    }

    /// Make `name` the only default profile, in a single write. Returns
    /// `false` if there is no profile with this name.
    pub async fn set_default(&self, name: &str) -> Result<bool> {
        let mut cache = self.cache.lock().await;
        self.load_locked(&mut cache).await?;

        if !cache.profiles.contains_key(name) {
            return Ok(false);
        }

        let mut profiles = cache.profiles.clone();
        for (key, profile) in profiles.iter_mut() {
            profile.metadata.is_default = key == name;
        }

        self.persist_locked(&mut cache, profiles).await?;
        Ok(true)
    }

    /// Stamp `lastUsed` with the current time.
    pub async fn mark_used(&self, name: &str) -> Result<bool> {
        self.update(
            name,
            ProfileUpdate {
                metadata: Some(MetadataUpdate {
                    last_used: Some(Utc::now()),
                    ..Default::default()
                }),
                ..Default::default()
            },
        )
        .await
    }

    /// Stamp `lastTested` with the current time.
    pub async fn mark_tested(&self, name: &str) -> Result<bool> {
        self.update(
            name,
            ProfileUpdate {
                metadata: Some(MetadataUpdate {
                    last_tested: Some(Utc::now()),
                    ..Default::default()
                }),
                ..Default::default()
            },
        )
        .await
    }

    // ========================================================================
    // Export / import
    // ========================================================================

    /// Serialize the on-disk container as JSON. URIs stay encrypted.
    pub async fn export(&self) -> Result<String> {
        let _cache = self.cache.lock().await;
        let storage = self.read_storage().await?;
        Ok(serde_json::to_string_pretty(&storage)?)
    }

    /// Import profiles from an exported container. Each entry is decoded,
    /// decrypted and added on its own; invalid or duplicate entries are
    /// skipped, while I/O failures stop the import and are returned.
    /// Returns how many profiles were added.
    pub async fn import(&self, data: &str) -> Result<usize> {
        let document: serde_json::Value = serde_json::from_str(data)?;
        let entries = document
            .get("profiles")
            .and_then(|p| p.as_array())
            .ok_or_else(|| MprofError::validation("import data has no 'profiles' array"))?;

        let mut imported = 0;
        for entry in entries {
            let stored: StoredProfile = match serde_json::from_value(entry.clone()) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping malformed profile entry");
                    continue;
                }
            };
            let name = stored.name.clone();

            let uri = match self.cipher.decrypt(&stored.encrypted_uri, &stored.iv) {
                Ok(uri) => uri,
                Err(e) => {
                    tracing::warn!(profile = %name, error = %e, "skipping profile that cannot be decrypted");
                    continue;
                }
            };

            match self.add(stored.into_profile(uri)).await {
                Ok(()) => imported += 1,
                Err(
                    e @ (MprofError::DuplicateName(_)
                    | MprofError::InvalidName(_)
                    | MprofError::InvalidUri(_)
                    | MprofError::Validation(_)),
                ) => tracing::warn!(profile = %name, error = %e, "skipping profile"),
                Err(e) => return Err(e),
            }
        }

        Ok(imported)
    }

    // ========================================================================
    // File handling
    // ========================================================================

    /// Refresh the cache from disk unless the file is unchanged since the
    /// last load. A missing file is an empty store.
    async fn load_locked(&self, cache: &mut ProfileCache) -> Result<()> {
        let modified = match fs::metadata(&self.path).await {
            Ok(meta) => meta.modified()?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.ensure_dir().await?;
                cache.profiles.clear();
                cache.undecryptable.clear();
                cache.modified = None;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        if cache.modified == Some(modified) && !cache.profiles.is_empty() {
            tracing::trace!(path = %self.path.display(), "profile cache hit");
            return Ok(());
        }

        let storage = self.read_storage().await?;
        let mut profiles = BTreeMap::new();
        let mut undecryptable = Vec::new();
        for stored in storage.profiles {
            match self.cipher.decrypt(&stored.encrypted_uri, &stored.iv) {
                Ok(uri) => {
                    profiles.insert(stored.name.clone(), stored.into_profile(uri));
                }
                Err(e) => {
                    tracing::warn!(
                        profile = %stored.name,
                        error = %e,
                        "failed to decrypt stored profile (wrong MPROF_SECRET?); hiding it but keeping it on disk"
                    );
                    undecryptable.push(stored);
                }
            }
        }

        tracing::debug!(path = %self.path.display(), count = profiles.len(), "loaded profiles from disk");
        cache.profiles = profiles;
        cache.undecryptable = undecryptable;
        cache.modified = Some(modified);
        cache.disk_loads += 1;
        Ok(())
    }

    /// Read the raw container. A missing file yields an empty one.
    async fn read_storage(&self) -> Result<ProfileStorage> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(ProfileStorage::empty()),
            Err(e) => Err(e.into()),
        }
    }

    /// Encrypt `profiles`, write them atomically and adopt them as the cache.
    ///
    /// Entries that failed to decrypt on load are carried over untouched
    /// unless a profile of the same name replaces them, so a wrong secret
    /// never erases data on the next write.
    async fn persist_locked(
        &self,
        cache: &mut ProfileCache,
        profiles: BTreeMap<String, ConnectionProfile>,
    ) -> Result<()> {
        let mut storage = self.read_storage().await?;
        storage.version = STORAGE_VERSION.to_string();
        storage.profiles = profiles
            .values()
            .map(|p| {
                let (encrypted_uri, iv) = self.cipher.encrypt(&p.uri)?;
                Ok(StoredProfile::from_parts(p, encrypted_uri, iv))
            })
            .collect::<Result<Vec<_>>>()?;
        let kept: Vec<StoredProfile> = cache
            .undecryptable
            .iter()
            .filter(|s| !profiles.contains_key(&s.name))
            .cloned()
            .collect();
        storage.profiles.extend(kept.iter().cloned());

        let json = serde_json::to_string_pretty(&storage)?;
        self.ensure_dir().await?;

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "profiles.json".to_string());
        let tmp_path = self
            .path
            .with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4()));

        fs::write(&tmp_path, json).await?;
        if let Err(e) = restrict_file_permissions(&tmp_path) {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e);
        }
        if let Err(e) = fs::rename(&tmp_path, &self.path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        let modified = fs::metadata(&self.path).await?.modified()?;
        cache.profiles = profiles;
        cache.undecryptable = kept;
        cache.modified = Some(modified);
        Ok(())
    }

    async fn ensure_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

fn clear_default(profiles: &mut BTreeMap<String, ConnectionProfile>) {
    for profile in profiles.values_mut() {
        profile.metadata.is_default = false;
    }
}
