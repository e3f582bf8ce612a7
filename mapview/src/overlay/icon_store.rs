use std::sync::Arc;

use ahash::AHashSet;
use parking_lot::{Mutex, RwLock};
use quick_cache::sync::Cache;
use tokio::runtime::Handle;

use crate::decoded_image::DecodedImage;
use crate::messenger::Messenger;
use crate::platform::PlatformService;

/// Source of a marker icon and the size it is drawn with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IconKey {
    path: String,
    size: Option<(u32, u32)>,
}

impl IconKey {
    /// Creates a new key. `size` of `None` keeps the native size of the image.
    pub fn new(path: impl Into<String>, size: Option<(u32, u32)>) -> Self {
        Self {
            path: path.into(),
            size,
        }
    }

    /// Url or file path of the image.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Size the icon is scaled to.
    pub fn size(&self) -> Option<(u32, u32)> {
        self.size
    }
}

/// Decoded marker icons, loaded in background.
///
/// An icon that failed to load is not requested again.
pub struct IconStore {
    icons: Arc<Cache<IconKey, Arc<DecodedImage>>>,
    loading: Arc<Mutex<AHashSet<IconKey>>>,
    failed: Arc<Mutex<AHashSet<IconKey>>>,
    platform: Arc<dyn PlatformService>,
    runtime: Option<Handle>,
    messenger: RwLock<Option<Arc<dyn Messenger>>>,
}

impl std::fmt::Debug for IconStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IconStore")
            .field("icons", &self.icons.len())
            .field("loading", &self.loading.lock().len())
            .finish()
    }
}

impl IconStore {
    /// Creates an empty store holding at most `capacity` icons.
    pub fn new(
        capacity: usize,
        platform: Arc<dyn PlatformService>,
        runtime: Option<Handle>,
    ) -> Self {
        Self {
            icons: Arc::new(Cache::new(capacity.max(1))),
            loading: Default::default(),
            failed: Default::default(),
            platform,
            runtime,
            messenger: RwLock::new(None),
        }
    }

    /// Sets the messenger asked to redraw the map when an icon is loaded.
    pub fn set_messenger(&self, messenger: Arc<dyn Messenger>) {
        *self.messenger.write() = Some(messenger);
    }

    /// Returns the icon if it is loaded.
    pub fn get(&self, key: &IconKey) -> Option<Arc<DecodedImage>> {
        self.icons.get(key)
    }

    /// Stores an already decoded image for the key, scaling it to the key's size.
    pub fn insert(&self, key: IconKey, image: DecodedImage) {
        let image = match key.size {
            Some((w, h)) => image.resized(w, h),
            None => image,
        };

        self.failed.lock().remove(&key);
        self.icons.insert(key, Arc::new(image));
    }

    /// Starts loading the icon unless it is loaded, being loaded, or failed before.
    pub fn request(&self, key: &IconKey) {
        if self.icons.get(key).is_some() || self.failed.lock().contains(key) {
            return;
        }

        if !self.loading.lock().insert(key.clone()) {
            return;
        }

        let key = key.clone();
        let icons = self.icons.clone();
        let loading = self.loading.clone();
        let failed = self.failed.clone();
        let platform = self.platform.clone();
        let messenger = self.messenger.read().clone();

        let task_key = key.clone();
        let spawned = crate::async_runtime::spawn(self.runtime.as_ref(), async move {
            let key = task_key;
            match platform.load_image(key.path()).await {
                Ok(image) => {
                    let image = match key.size() {
                        Some((w, h)) => image.resized(w, h),
                        None => image,
                    };

                    log::debug!("Loaded marker icon {}", key.path());
                    icons.insert(key.clone(), Arc::new(image));
                    if let Some(messenger) = messenger {
                        messenger.request_redraw();
                    }
                }
                Err(err) => {
                    log::warn!("Failed to load marker icon {}: {err}", key.path());
                    failed.lock().insert(key.clone());
                }
            }

            loading.lock().remove(&key);
        });

        if spawned.is_none() {
            self.loading.lock().remove(&key);
        }
    }

    /// Returns true if the icon is being loaded.
    pub fn is_loading(&self, key: &IconKey) -> bool {
        self.loading.lock().contains(key)
    }

    /// Returns true if loading of the icon failed.
    pub fn is_failed(&self, key: &IconKey) -> bool {
        self.failed.lock().contains(key)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::tests::{wait_until, TestPlatform};

    #[tokio::test]
    async fn loads_and_resizes_icon() {
        let platform = Arc::new(TestPlatform::default());
        let store = IconStore::new(4, platform.clone(), None);
        let native = IconKey::new("http://example.com/marker.png", None);
        let sized = IconKey::new("http://example.com/marker.png", Some((64, 64)));

        store.request(&native);
        store.request(&native);
        store.request(&sized);
        assert!(store.is_loading(&native));

        wait_until(|| store.get(&native).is_some() && store.get(&sized).is_some()).await;
        assert_eq!(store.get(&native).unwrap().width(), 10);
        assert_eq!(store.get(&sized).unwrap().height(), 64);
        assert_eq!(platform.loads.load(Ordering::Acquire), 2);
    }

    #[tokio::test]
    async fn failed_icon_is_not_requested_again() {
        let platform = Arc::new(TestPlatform::default());
        let store = IconStore::new(4, platform.clone(), None);
        let key = IconKey::new("/sdcard/missing.png", None);

        store.request(&key);
        wait_until(|| store.is_failed(&key)).await;
        wait_until(|| !store.is_loading(&key)).await;
        store.request(&key);
        assert!(!store.is_loading(&key));
        assert_eq!(platform.loads.load(Ordering::Acquire), 1);
    }
}
