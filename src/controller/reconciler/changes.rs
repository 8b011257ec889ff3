//! # Change Detection
//!
//! Compares two views of the same secret key by key and reports which keys
//! now hold different content.
//!
//! Removed keys (present only in the baseline) are not reported.

use crate::controller::reconciler::fingerprint::{fingerprint, Fingerprint};
use crate::controller::reconciler::types::SecretKey;
use k8s_openapi::api::core::v1::Secret;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::{Mutex, PoisonError};
use zeroize::Zeroizing;

/// Point-in-time contents of a secret
///
/// Values are wiped when the snapshot is dropped and are never printed.
#[derive(Clone)]
pub struct SecretSnapshot {
    key: SecretKey,
    data: BTreeMap<String, Zeroizing<Vec<u8>>>,
}

impl SecretSnapshot {
    #[must_use]
    pub fn new(key: SecretKey) -> Self {
        Self {
            key,
            data: BTreeMap::new(),
        }
    }

    /// Builder-style insert
    #[must_use]
    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace a value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.data.insert(name.into(), Zeroizing::new(value.into()));
    }

    /// Snapshot of a `Secret` object's `data`
    ///
    /// The API server never returns `stringData`, so only `data` is read.
    #[must_use]
    pub fn from_secret(secret: &Secret) -> Self {
        let mut snapshot = Self::new(SecretKey::from_secret(secret));
        for (name, value) in secret.data.iter().flatten() {
            snapshot.insert(name.clone(), value.0.clone());
        }
        snapshot
    }

    #[must_use]
    pub fn key(&self) -> &SecretKey {
        &self.key
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.data.get(name).map(|v| v.as_slice())
    }

    /// Key names in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for SecretSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretSnapshot")
            .field("key", &self.key)
            .field("keys", &self.data.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Fingerprint of every key in a snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyFingerprints(BTreeMap<String, Fingerprint>);

impl KeyFingerprints {
    #[must_use]
    pub fn of(snapshot: &SecretSnapshot) -> Self {
        Self(
            snapshot
                .data
                .iter()
                .map(|(name, value)| (name.clone(), fingerprint(value)))
                .collect(),
        )
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Fingerprint> {
        self.0.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Keys of `current` whose content differs from `baseline`
///
/// A key is changed when there is no baseline, when the baseline lacks the key,
/// or when the fingerprints differ.
#[must_use]
pub fn detect_changes(baseline: Option<&SecretSnapshot>, current: &SecretSnapshot) -> BTreeSet<String> {
    current
        .data
        .iter()
        .filter(|(name, value)| {
            baseline
                .and_then(|b| b.get(name))
                .is_none_or(|old| fingerprint(old) != fingerprint(value))
        })
        .map(|(name, _)| name.clone())
        .collect()
}

/// Same comparison as [`detect_changes`], against remembered fingerprints
#[must_use]
pub fn detect_changes_against(
    baseline: Option<&KeyFingerprints>,
    current: &KeyFingerprints,
) -> BTreeSet<String> {
    current
        .0
        .iter()
        .filter(|(name, fp)| baseline.and_then(|b| b.get(name)) != Some(*fp))
        .map(|(name, _)| name.clone())
        .collect()
}

/// Fingerprints per secret, as of the last successful pass
///
/// Lives for the lifetime of the process only.
#[derive(Debug, Default)]
pub struct FingerprintCache {
    entries: Mutex<HashMap<SecretKey, KeyFingerprints>>,
}

impl FingerprintCache {
    #[must_use]
    pub fn get(&self, key: &SecretKey) -> Option<KeyFingerprints> {
        self.lock().get(key).cloned()
    }

    pub fn store(&self, key: SecretKey, fingerprints: KeyFingerprints) {
        self.lock().insert(key, fingerprints);
    }

    pub fn evict(&self, key: &SecretKey) -> Option<KeyFingerprints> {
        self.lock().remove(key)
    }

    /// Drop every entry whose secret `keep` rejects; returns how many were dropped
    pub fn retain(&self, mut keep: impl FnMut(&SecretKey) -> bool) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|key, _| keep(key));
        before - entries.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SecretKey, KeyFingerprints>> {
        // Entries are replaced whole, so a poisoned map is still consistent
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
