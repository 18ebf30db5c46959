//! Lookup table from location-string to [`Identity`], shared by reference
//! across the clients on a router.

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::sync::RwLock;

use ejtp_proto::{Address, IdentityLookup, JsonValue, ProtoError};

use crate::error::CoreError;
use crate::identity::Identity;

/// A synchronized lookup table from an address's string form to the
/// [`Identity`] registered at it.
///
/// Typically shared by `Arc` reference across every [`crate::Client`] on one
/// [`crate::Router`]; internal locking makes concurrent reads and writes
/// safe, but callers composing multiple operations into one logical
/// transaction (e.g. "insert if absent, else mutate") still need to hold
/// their own external synchronization across the pair of calls.
#[derive(Default)]
pub struct IdentityCache {
    entries: RwLock<BTreeMap<String, Identity>>,
}

impl IdentityCache {
    /// An empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the identity registered at `location`'s string form.
    pub fn get(&self, location: &Address) -> Result<Option<Identity>, CoreError> {
        let key = location.export()?;
        Ok(self.get_by_key(&key))
    }

    /// Look up the identity registered under a raw cache key (an address's
    /// string form).
    #[must_use]
    pub fn get_by_key(&self, key: &str) -> Option<Identity> {
        self.lock_read().get(key).cloned()
    }

    /// Register `identity` under the string form of its own location.
    /// Fails with [`CoreError::AddressMismatch`] if the two disagree — this
    /// can only happen if a caller builds an `Identity` by hand with an
    /// inconsistent key, since `Identity::key` is always derived from its
    /// own location.
    pub fn put(&self, identity: Identity) -> Result<(), CoreError> {
        let key = identity.key()?;
        self.lock_write().insert(key, identity);
        Ok(())
    }

    /// Register `identity` under an explicit `key`, validating that the
    /// identity's own location stringifies to that same key.
    pub fn put_at(&self, key: impl Into<String>, identity: Identity) -> Result<(), CoreError> {
        let key = key.into();
        let location_key = identity.key()?;
        if location_key != key {
            return Err(CoreError::AddressMismatch {
                key,
                location: location_key,
            });
        }
        self.lock_write().insert(key, identity);
        Ok(())
    }

    /// Remove the identity registered at `location`, if any.
    pub fn delete(&self, location: &Address) -> Result<Option<Identity>, CoreError> {
        let key = location.export()?;
        Ok(self.lock_write().remove(&key))
    }

    /// The first identity (by key order) whose name equals `name`.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<Identity> {
        self.lock_read()
            .values()
            .find(|identity| identity.name() == name)
            .cloned()
    }

    /// Every identity whose name equals `name`, in key order.
    #[must_use]
    pub fn filter_by_name(&self, name: &str) -> Vec<Identity> {
        self.lock_read()
            .values()
            .filter(|identity| identity.name() == name)
            .cloned()
            .collect()
    }

    /// Every identity whose encryptor reports `can_encrypt() == true`.
    ///
    /// Identities whose prototype fails to build a live encryptor are
    /// skipped rather than propagated as an error, since this is a filter
    /// over otherwise-valid cache contents, not a single lookup.
    #[must_use]
    pub fn encrypt_capable(&self) -> Vec<Identity> {
        self.lock_read()
            .values()
            .filter(|identity| identity.encryptor().is_ok_and(|enc| enc.can_encrypt()))
            .cloned()
            .collect()
    }

    /// Merge every entry of `others` into this cache. On a key collision the
    /// later writer — meaning the later cache argument, and within a cache
    /// its key order — wins.
    pub fn sync<'a>(&self, others: impl IntoIterator<Item = &'a IdentityCache>) {
        for other in others {
            let incoming = other.lock_read();
            self.lock_write().extend(incoming.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
    }

    /// All registered keys, in sorted order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.lock_read().keys().cloned().collect()
    }

    /// Number of registered identities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock_read().len()
    }

    /// Whether the cache holds no identities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock_read().is_empty()
    }

    /// Render the cache as a JSON object keyed by location-string.
    pub fn serialize(&self) -> Result<JsonValue, CoreError> {
        let mut pairs = Vec::new();
        for (key, identity) in self.lock_read().iter() {
            pairs.push((key.clone(), identity.to_json()?));
        }
        Ok(JsonValue::Object(pairs.into_iter().collect()))
    }

    /// Reconstruct a cache from its [`IdentityCache::serialize`] form.
    /// Fails with [`CoreError::MismatchedKey`] if any record's own location
    /// doesn't stringify to the object key it was filed under.
    pub fn deserialize(value: &JsonValue) -> Result<Self, CoreError> {
        let JsonValue::Object(map) = value else {
            return Err(CoreError::MalformedPrototype(
                "identity cache must be a JSON object".to_owned(),
            ));
        };
        let cache = Self::new();
        for (key, record) in map {
            let identity = Identity::from_json(record)?;
            let location_key = identity.key()?;
            if &location_key != key {
                return Err(CoreError::MismatchedKey {
                    key: key.clone(),
                    location: location_key,
                });
            }
            cache.lock_write().insert(key.clone(), identity);
        }
        Ok(cache)
    }

    /// Load a cache by parsing JSON text read from `reader`.
    pub fn load_from(reader: &mut impl Read) -> Result<Self, CoreError> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        let value = ejtp_proto::json::parse(text.as_bytes())?;
        Self::deserialize(&value)
    }

    /// Save the cache as canonical JSON text to `writer`. `indent` is
    /// accepted for API symmetry with pretty-printing callers but the wire
    /// form is always the canonical, whitespace-free encoding — indentation
    /// is not part of this protocol's file format.
    pub fn save_to(&self, writer: &mut impl Write, _indent: Option<usize>) -> Result<(), CoreError> {
        let bytes = ejtp_proto::json::strict_encode(&self.serialize()?)?;
        writer.write_all(&bytes)?;
        Ok(())
    }

    fn lock_read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, Identity>> {
        #[allow(clippy::expect_used, reason = "identity cache lock is never held across a panic")]
        self.entries.read().expect("identity cache lock poisoned")
    }

    fn lock_write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, Identity>> {
        #[allow(clippy::expect_used, reason = "identity cache lock is never held across a panic")]
        self.entries.write().expect("identity cache lock poisoned")
    }
}

impl IdentityLookup for IdentityCache {
    fn decrypt(&self, address: &Address, ciphertext: &[u8]) -> Result<Vec<u8>, ProtoError> {
        let identity = self
            .get(address)
            .ok()
            .flatten()
            .ok_or_else(|| ProtoError::NoIdentity(address.to_string()))?;
        let encryptor = identity
            .encryptor()
            .map_err(|e| ProtoError::DecryptError(e.to_string()))?;
        encryptor
            .decrypt(ciphertext)
            .map_err(|e| ProtoError::DecryptError(e.to_string()))
    }

    fn verify_signature(
        &self,
        address: &Address,
        signature: &[u8],
        content: &[u8],
    ) -> Result<(), ProtoError> {
        let identity = self
            .get(address)
            .ok()
            .flatten()
            .ok_or_else(|| ProtoError::NoIdentity(address.to_string()))?;
        let encryptor = identity
            .encryptor()
            .map_err(|e| ProtoError::DecryptError(e.to_string()))?;
        let ok = encryptor
            .sig_verify(content, signature)
            .map_err(|e| ProtoError::DecryptError(e.to_string()))?;
        if ok {
            Ok(())
        } else {
            Err(ProtoError::BadSignature)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ejtp_crypto::Prototype;

    fn identity(callsign: &str, shift: i32) -> Identity {
        Identity::new(
            callsign,
            Address::new("local", JsonValue::Null, Some(JsonValue::string(callsign))),
            Prototype::Rotate { shift },
        )
    }

    #[test]
    fn put_then_get_round_trips() {
        let cache = IdentityCache::new();
        let id = identity("alice", 1);
        let location = id.location().clone();
        cache.put(id).unwrap();
        let found = cache.get(&location).unwrap().unwrap();
        assert_eq!(found.name(), "alice");
    }

    #[test]
    fn put_at_rejects_mismatched_key() {
        let cache = IdentityCache::new();
        let id = identity("alice", 1);
        assert!(cache.put_at("not-the-real-key", id).is_err());
    }

    #[test]
    fn find_by_name_returns_first_match() {
        let cache = IdentityCache::new();
        cache.put(identity("alice", 1)).unwrap();
        assert!(cache.find_by_name("alice").is_some());
        assert!(cache.find_by_name("nobody").is_none());
    }

    #[test]
    fn delete_removes_entry() {
        let cache = IdentityCache::new();
        let id = identity("alice", 1);
        let location = id.location().clone();
        cache.put(id).unwrap();
        cache.delete(&location).unwrap();
        assert!(cache.get(&location).unwrap().is_none());
    }

    #[test]
    fn sync_merges_other_caches() {
        let a = IdentityCache::new();
        a.put(identity("alice", 1)).unwrap();
        let b = IdentityCache::new();
        b.put(identity("bob", 2)).unwrap();

        a.sync([&b]);
        assert_eq!(a.len(), 2);
        assert!(a.find_by_name("bob").is_some());
    }

    #[test]
    fn serialize_deserialize_round_trips() {
        let cache = IdentityCache::new();
        cache.put(identity("alice", 1)).unwrap();
        cache.put(identity("bob", 2)).unwrap();

        let value = cache.serialize().unwrap();
        let restored = IdentityCache::deserialize(&value).unwrap();
        assert_eq!(restored.len(), 2);
        assert!(restored.find_by_name("alice").is_some());
    }

    #[test]
    fn deserialize_rejects_mismatched_key() {
        let bad = JsonValue::Object(
            [(
                "wrong-key".to_owned(),
                identity("alice", 1).to_json().unwrap(),
            )]
            .into_iter()
            .collect(),
        );
        let err = IdentityCache::deserialize(&bad).unwrap_err();
        assert!(matches!(err, CoreError::MismatchedKey { .. }));
    }

    #[test]
    fn identity_lookup_decrypt_delegates_to_encryptor() {
        let cache = IdentityCache::new();
        let id = identity("alice", 4);
        let location = id.location().clone();
        cache.put(id).unwrap();

        let plaintext = cache.decrypt(&location, b"Euyefsskmi").unwrap();
        assert_eq!(plaintext, b"Aquaboogie");
    }

    #[test]
    fn identity_lookup_decrypt_fails_without_identity() {
        let cache = IdentityCache::new();
        let unknown = Address::new("local", JsonValue::Null, Some(JsonValue::string("ghost")));
        assert!(matches!(
            cache.decrypt(&unknown, b"anything").unwrap_err(),
            ProtoError::NoIdentity(_)
        ));
    }

    #[test]
    fn identity_lookup_verify_signature_rejects_tampered_content() {
        let cache = IdentityCache::new();
        let id = identity("alice", 4);
        let location = id.location().clone();
        let encryptor = id.encryptor().unwrap();
        cache.put(id).unwrap();

        let sig = encryptor.sign(b"hello").unwrap();
        assert!(cache.verify_signature(&location, &sig, b"hello").is_ok());
        assert!(matches!(
            cache.verify_signature(&location, &sig, b"tampered").unwrap_err(),
            ProtoError::BadSignature
        ));
    }
}
