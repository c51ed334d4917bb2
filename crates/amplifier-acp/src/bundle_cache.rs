//! Prepared-bundle cache keyed by a canonical hash of `(bundle, behaviors,
//! provider_config)`, per §4.6/§9 and testable property 8. Bundle
//! preparation itself is out of scope (agent reasoning loop, module
//! discovery) — this only owns the caching contract, generic over whatever
//! opaque handle the caller's preparer returns.

use serde_json::Value;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted: Vec<(String, Value)> = map.iter().map(|(k, v)| (k.clone(), canonicalize(v))).collect();
            sorted.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

fn cache_key(bundle: &str, behaviors: &[String], provider_config: &Value) -> String {
    let mut sorted_behaviors = behaviors.to_vec();
    sorted_behaviors.sort();
    let canonical_provider = canonicalize(provider_config);

    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    bundle.hash(&mut hasher);
    sorted_behaviors.hash(&mut hasher);
    canonical_provider.to_string().hash(&mut hasher);
    format!("{bundle}:{:x}", hasher.finish())
}

pub struct PreparedBundleCache<T: Clone> {
    prepared: Mutex<HashMap<String, T>>,
    raw: Mutex<HashMap<String, T>>,
}

impl<T: Clone> Default for PreparedBundleCache<T> {
    fn default() -> Self {
        Self { prepared: Mutex::new(HashMap::new()), raw: Mutex::new(HashMap::new()) }
    }
}

impl<T: Clone> PreparedBundleCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached prepared bundle for this exact key, calling
    /// `prepare` only on a miss. Property 8: equal `(bundle, behaviors,
    /// provider_config)` must return the same handle; any difference must not.
    pub fn get_or_prepare(
        &self,
        bundle: &str,
        behaviors: &[String],
        provider_config: &Value,
        prepare: impl FnOnce() -> T,
    ) -> T {
        let key = cache_key(bundle, behaviors, provider_config);
        let mut prepared = self.prepared.lock().unwrap();
        if let Some(existing) = prepared.get(&key) {
            return existing.clone();
        }
        let value = prepare();
        prepared.insert(key, value.clone());
        value
    }

    /// Raw (unprepared) bundle loads, cached by bundle name alone.
    pub fn get_or_load_raw(&self, bundle: &str, load: impl FnOnce() -> T) -> T {
        let mut raw = self.raw.lock().unwrap();
        if let Some(existing) = raw.get(bundle) {
            return existing.clone();
        }
        let value = load();
        raw.insert(bundle.to_string(), value.clone());
        value
    }

    /// Remove every prepared entry for `bundle`, keeping entries for other bundles.
    pub fn invalidate_bundle(&self, bundle: &str) {
        let prefix = format!("{bundle}:");
        self.prepared.lock().unwrap().retain(|k, _| !k.starts_with(&prefix));
        self.raw.lock().unwrap().remove(bundle);
    }

    pub fn invalidate_all(&self) {
        self.prepared.lock().unwrap().clear();
        self.raw.lock().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn equal_keys_return_the_same_object_without_repreparing() {
        let cache: PreparedBundleCache<Arc<str>> = PreparedBundleCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let make = |calls: Arc<AtomicUsize>| {
            move || {
                calls.fetch_add(1, Ordering::SeqCst);
                Arc::<str>::from("prepared-handle")
            }
        };

        let a = cache.get_or_prepare("foo", &["x".into(), "y".into()], &json!({"model": "m1"}), make(calls.clone()));
        let b = cache.get_or_prepare("foo", &["y".into(), "x".into()], &json!({"model": "m1"}), make(calls.clone()));

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn distinct_provider_config_returns_distinct_objects() {
        let cache: PreparedBundleCache<Arc<str>> = PreparedBundleCache::new();
        let a = cache.get_or_prepare("foo", &[], &json!({"model": "m1"}), || Arc::<str>::from("a"));
        let b = cache.get_or_prepare("foo", &[], &json!({"model": "m2"}), || Arc::<str>::from("b"));
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn invalidate_bundle_only_clears_that_bundles_entries() {
        let cache: PreparedBundleCache<Arc<str>> = PreparedBundleCache::new();
        cache.get_or_prepare("foo", &[], &json!({}), || Arc::<str>::from("a"));
        cache.get_or_prepare("bar", &[], &json!({}), || Arc::<str>::from("b"));
        cache.invalidate_bundle("foo");

        let calls = Arc::new(AtomicUsize::new(0));
        let recreated = cache.get_or_prepare("foo", &[], &json!({}), {
            let calls = calls.clone();
            move || {
                calls.fetch_add(1, Ordering::SeqCst);
                Arc::<str>::from("a2")
            }
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1, "foo must have been re-prepared");
        assert_eq!(&*recreated, "a2");
    }
}
