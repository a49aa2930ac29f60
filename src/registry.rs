use crate::constants::OBJECT_URL_SCHEME;
use crate::payload::ImageFile;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// In-memory object-URL namespace.
///
/// Maps opaque `blob:img-squeeze/<uuid>` strings to files. Entries stay
/// until revoked; clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct ObjectUrlRegistry {
    entries: Arc<RwLock<HashMap<String, ImageFile>>>,
}

impl ObjectUrlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, file: ImageFile) -> String {
        let url = format!("{}{}", OBJECT_URL_SCHEME, Uuid::new_v4());
        self.entries.write().insert(url.clone(), file);
        tracing::trace!(%url, "object URL registered");
        url
    }

    pub fn resolve(&self, url: &str) -> Option<ImageFile> {
        self.entries.read().get(url).cloned()
    }

    /// Removes `url`. Returns whether an entry existed; unknown or
    /// already-revoked URLs are ignored.
    pub fn revoke(&self, url: &str) -> bool {
        let removed = self.entries.write().remove(url).is_some();
        if removed {
            tracing::trace!(%url, "object URL revoked");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Releases one registry entry. Must be called once the URL is no longer
/// needed; dropping it without calling [`revoke`](Self::revoke) keeps the
/// entry alive for the registry's lifetime.
#[derive(Debug, Clone)]
#[must_use = "the object URL stays registered until revoke() is called"]
pub struct ObjectUrlRevoker {
    registry: ObjectUrlRegistry,
    url: String,
}

impl ObjectUrlRevoker {
    pub(crate) fn new(registry: ObjectUrlRegistry, url: String) -> Self {
        Self { registry, url }
    }

    /// Idempotent.
    pub fn revoke(&self) {
        self.registry.revoke(&self.url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file() -> ImageFile {
        ImageFile::new(vec![1u8, 2, 3], "a.compressed.png", "image/png")
    }

    #[test]
    fn test_register_and_resolve() {
        let registry = ObjectUrlRegistry::new();
        let url = registry.register(file());

        assert!(url.starts_with("blob:img-squeeze/"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.resolve(&url).unwrap().name(), "a.compressed.png");
    }

    #[test]
    fn test_urls_are_unique() {
        let registry = ObjectUrlRegistry::new();
        let a = registry.register(file());
        let b = registry.register(file());
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_revoke_is_idempotent() {
        let registry = ObjectUrlRegistry::new();
        let url = registry.register(file());

        assert!(registry.revoke(&url));
        assert!(!registry.revoke(&url));
        assert!(registry.resolve(&url).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_revoker_only_removes_its_entry() {
        let registry = ObjectUrlRegistry::new();
        let keep = registry.register(file());
        let drop_url = registry.register(file());

        let revoker = ObjectUrlRevoker::new(registry.clone(), drop_url.clone());
        revoker.revoke();
        revoker.revoke();

        assert!(registry.resolve(&drop_url).is_none());
        assert!(registry.resolve(&keep).is_some());
    }
}
