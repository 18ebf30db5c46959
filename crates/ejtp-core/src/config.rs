//! Identity cache path resolution: which file(s) back an [`IdentityCache`]
//! on disk.
//!
//! `EJTP_IDENTITY_CACHE_PATH` names a colon-separated list of paths, in the
//! same shape as `PATH`, that overrides a caller-supplied default list
//! wholesale when set and non-empty. This is the one piece of "where do my
//! identities live" that behaves as pure library code rather than as an
//! application: no file watching, no write-back selection, no format
//! negotiation.

use std::env;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::cache::IdentityCache;
use crate::error::CoreError;

const ENV_VAR: &str = "EJTP_IDENTITY_CACHE_PATH";

/// Resolve the candidate path list: `EJTP_IDENTITY_CACHE_PATH`, split on
/// `:`, if set and non-empty; otherwise `defaults` verbatim. `~` is not
/// expanded here — that is left to the caller, if wanted.
#[must_use]
pub fn candidate_paths(defaults: &[PathBuf]) -> Vec<PathBuf> {
    resolve_candidates(env::var(ENV_VAR).ok(), defaults)
}

/// The pure decision behind [`candidate_paths`], taking the env var's value
/// (if any) as a plain argument so it can be tested without touching process
/// environment state.
fn resolve_candidates(env_value: Option<String>, defaults: &[PathBuf]) -> Vec<PathBuf> {
    match env_value {
        Some(value) if !value.is_empty() => value.split(':').map(PathBuf::from).collect(),
        _ => defaults.to_vec(),
    }
}

/// Filter `candidates` down to the ones that exist on disk, preserving
/// order.
#[must_use]
pub fn existing_paths(candidates: &[PathBuf]) -> Vec<PathBuf> {
    candidates.iter().filter(|path| path.exists()).cloned().collect()
}

/// Build the candidate list from `defaults`, load every existing one, and
/// merge them into a single cache via [`IdentityCache::sync`] (later path in
/// the list wins on key collision). An empty cache, not an error, if no
/// candidate path exists.
pub fn load_identity_cache(defaults: &[PathBuf]) -> Result<IdentityCache, CoreError> {
    let candidates = candidate_paths(defaults);
    let existing = existing_paths(&candidates);

    let loaded: Vec<IdentityCache> = existing
        .iter()
        .map(|path| load_one(path))
        .collect::<Result<_, CoreError>>()?;

    let merged = IdentityCache::new();
    merged.sync(loaded.iter());
    Ok(merged)
}

fn load_one(path: &Path) -> Result<IdentityCache, CoreError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    IdentityCache::load_from(&mut reader)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write as _;

    use ejtp_crypto::Prototype;
    use ejtp_proto::{Address, JsonValue};

    use super::*;
    use crate::identity::Identity;

    fn local(callsign: &str) -> Address {
        Address::new("local", JsonValue::Null, Some(JsonValue::string(callsign)))
    }

    #[test]
    fn defaults_are_used_when_env_var_is_unset() {
        let defaults = vec![PathBuf::from("/tmp/a.json"), PathBuf::from("/tmp/b.json")];
        assert_eq!(resolve_candidates(None, &defaults), defaults);
    }

    #[test]
    fn empty_env_var_falls_back_to_defaults() {
        let defaults = vec![PathBuf::from("/tmp/a.json")];
        assert_eq!(resolve_candidates(Some(String::new()), &defaults), defaults);
    }

    #[test]
    fn env_var_overrides_defaults_wholesale() {
        let resolved = resolve_candidates(
            Some("/tmp/one.json:/tmp/two.json".to_string()),
            &[PathBuf::from("/tmp/ignored.json")],
        );
        assert_eq!(resolved, vec![PathBuf::from("/tmp/one.json"), PathBuf::from("/tmp/two.json")]);
    }

    #[test]
    fn missing_candidates_yield_an_empty_cache_not_an_error() {
        let cache = load_identity_cache(&[PathBuf::from("/nonexistent/path/idents.json")]).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn existing_file_is_loaded_and_merged() {
        let cache = IdentityCache::new();
        cache.put(Identity::new("alice", local("alice"), Prototype::Rotate { shift: 2 })).unwrap();

        let mut tmp = tempfile_path();
        {
            let mut file = File::create(&tmp).unwrap();
            let mut buf = Vec::new();
            cache.save_to(&mut buf, None).unwrap();
            file.write_all(&buf).unwrap();
        }

        let loaded = load_identity_cache(&[tmp.clone()]).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.find_by_name("alice").unwrap().prototype(), &Prototype::Rotate { shift: 2 });

        std::fs::remove_file(&tmp).ok();
    }

    fn tempfile_path() -> PathBuf {
        let mut path = env::temp_dir();
        let unique = format!("ejtp-core-config-test-{:?}.json", std::thread::current().id());
        path.push(unique);
        path
    }
}
