//! Bounded caches and registry settings.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use oxide_bind_core::argument::Arguments;
use oxide_bind_core::cache::{BoundedCache, Caches, MetadataCache};
use oxide_bind_core::config::{CacheSettings, Eviction};
use oxide_bind_core::property::{DeclaredElement, Qualifiers};
use oxide_bind_core::types::TypeDescriptor;
use oxide_bind_core::{ConfigRegistry, QualifiedType, Settings};

fn squares(calls: &Arc<AtomicUsize>, settings: &CacheSettings) -> BoundedCache<u32, u64> {
    let calls = Arc::clone(calls);
    BoundedCache::new(settings, move |key: &u32, _registry: &ConfigRegistry| {
        calls.fetch_add(1, Ordering::SeqCst);
        u64::from(*key) * u64::from(*key)
    })
}

// =============================================================================
// Test: Eviction and accounting
// =============================================================================

#[test]
fn test_eviction_keeps_size_at_limit() {
    let registry = ConfigRegistry::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let cache = squares(&calls, &CacheSettings::bounded(2));

    assert_eq!(cache.get(&1, &registry), 1);
    assert_eq!(cache.get(&2, &registry), 4);
    assert_eq!(cache.get(&3, &registry), 9);
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.get(&3, &registry), 9);

    assert_eq!(cache.stats(), "size=2 maximum_size=2 hits=1 misses=3");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_fifo_evicts_oldest() {
    let registry = ConfigRegistry::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let cache = squares(&calls, &CacheSettings::bounded(2));
    cache.get(&1, &registry);
    cache.get(&2, &registry);
    cache.get(&1, &registry);
    cache.get(&3, &registry);
    assert!(!cache.contains(&1));
    assert!(cache.contains(&2));
    assert!(cache.contains(&3));
}

#[test]
fn test_newest_evicts_latest() {
    let registry = ConfigRegistry::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let settings = CacheSettings {
        maximum_size: Some(2),
        eviction: Eviction::Newest,
    };
    let cache = squares(&calls, &settings);
    cache.get(&1, &registry);
    cache.get(&2, &registry);
    cache.get(&3, &registry);
    assert!(cache.contains(&1));
    assert!(!cache.contains(&2));
    assert!(cache.contains(&3));
}

#[test]
fn test_disabled_cache_always_recomputes() {
    let registry = ConfigRegistry::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let cache = squares(&calls, &CacheSettings::bounded(0));
    cache.get(&5, &registry);
    cache.get(&5, &registry);
    assert!(cache.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(cache.stats(), "size=0 maximum_size=0 hits=0 misses=2");
}

#[test]
fn test_metadata_cache_never_evicts() {
    let cache: MetadataCache<u32, Arc<String>> = MetadataCache::new();
    for n in 0..100 {
        cache.get_or_insert_with(n, || Arc::new(n.to_string()));
    }
    let first = cache.get_or_insert_with(7, || Arc::new(String::from("other")));
    assert_eq!(first.as_str(), "7");
    assert_eq!(cache.len(), 100);
}

// =============================================================================
// Test: Registry caches
// =============================================================================

#[test]
fn test_registry_cache_settings_reach_qualifier_cache() {
    struct Owner;

    let registry = ConfigRegistry::new();
    registry.get::<Caches>().set_maximum_size(Some(1));
    let qualifiers = registry.get::<Qualifiers>();
    let element = |name: &str| {
        DeclaredElement::new(TypeDescriptor::of::<Owner>(), name, QualifiedType::of::<String>())
    };
    qualifiers.qualify(&element("a")).unwrap();
    qualifiers.qualify(&element("b")).unwrap();
    qualifiers.qualify(&element("b")).unwrap();
    assert_eq!(qualifiers.stats(), "size=1 maximum_size=1 hits=1 misses=2");
}

// =============================================================================
// Test: Settings
// =============================================================================

#[test]
fn test_settings_from_json() {
    let settings: Settings = serde_json::from_str(
        r#"{
            "cache": { "maximum_size": 2, "eviction": "newest" },
            "arguments": { "prepared_arguments_enabled": false }
        }"#,
    )
    .unwrap();
    assert_eq!(settings.cache.maximum_size, Some(2));
    assert_eq!(settings.cache.eviction, Eviction::Newest);

    let registry = ConfigRegistry::with_settings(&settings);
    assert_eq!(registry.get::<Caches>().settings(), settings.cache);
    assert!(!registry.get::<Arguments>().prepared_arguments_enabled());
}

#[test]
fn test_partial_settings_use_defaults() {
    let settings: Settings =
        serde_json::from_str(r#"{ "cache": { "maximum_size": null } }"#).unwrap();
    assert_eq!(settings.cache.maximum_size, None);
    assert_eq!(settings.cache.eviction, Eviction::Fifo);
    assert!(settings.arguments.prepared_arguments_enabled);
}
