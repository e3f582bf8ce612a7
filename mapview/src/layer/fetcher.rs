use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tokio::sync::Semaphore;

use super::raster_tile_layer::{LayerSpec, TileLoader};
use super::tile_cache::{CancellationFlag, EvictionListener, TileCache, TileEntry, TileState};
use super::{LayerId, TileKey, UrlTemplate};
use crate::config::EngineConfig;
use crate::messenger::{MapEvent, Messenger};

struct LayerSlot {
    url_template: UrlTemplate,
    semaphore: Arc<Semaphore>,
    next_subdomain: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl LayerSlot {
    fn new(spec: &LayerSpec) -> Self {
        Self {
            url_template: spec.url_template().clone(),
            semaphore: Arc::new(Semaphore::new(spec.parallel_requests())),
            next_subdomain: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }
}

struct FetcherInner {
    cache: Arc<TileCache>,
    loader: Arc<dyn TileLoader>,
    config: EngineConfig,
    runtime: Option<Handle>,
    messenger: RwLock<Option<Arc<dyn Messenger>>>,
    layers: RwLock<AHashMap<LayerId, Arc<LayerSlot>>>,
    requests: Mutex<AHashMap<TileKey, CancellationFlag>>,
}

impl EvictionListener for FetcherInner {
    fn pending_evicted(&self, key: TileKey) {
        log::debug!("Pending tile {key} was evicted, cancelling its request");
        if let Some(flag) = self.requests.lock().remove(&key) {
            flag.cancel();
        }
    }
}

impl FetcherInner {
    fn notify(&self, event: MapEvent) {
        if let Some(messenger) = &*self.messenger.read() {
            messenger.notify(event);
            messenger.request_redraw();
        }
    }

    fn finish(&self, key: &TileKey, flag: &CancellationFlag) {
        let mut requests = self.requests.lock();
        if requests.get(key).is_some_and(|current| current.same_as(flag)) {
            requests.remove(key);
        }
    }
}

/// Downloads tiles of all layers into the [`TileCache`].
///
/// Every layer has its own limit of concurrent requests. Each request is a separate task on the
/// tokio runtime that waits for a free slot of its layer, loads the tile and puts the result into
/// the cache unless the request was cancelled in the meantime. Failed requests are retried with
/// exponential backoff up to [`EngineConfig::max_attempts`] times.
///
/// The fetcher is cheap to clone; all clones share the same state.
#[derive(Clone)]
pub struct TileFetcher {
    inner: Arc<FetcherInner>,
}

impl std::fmt::Debug for TileFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileFetcher")
            .field("requests", &self.inner.requests.lock().len())
            .finish()
    }
}

impl TileFetcher {
    /// Creates a new fetcher writing into `cache`. The fetcher registers itself as the eviction
    /// listener of the cache.
    ///
    /// Requests are spawned on `runtime`, or on the runtime of the calling context if `None`.
    pub fn new(
        cache: Arc<TileCache>,
        loader: Arc<dyn TileLoader>,
        config: EngineConfig,
        runtime: Option<Handle>,
    ) -> Self {
        let inner = Arc::new(FetcherInner {
            cache,
            loader,
            config,
            runtime,
            messenger: RwLock::new(None),
            layers: RwLock::new(AHashMap::new()),
            requests: Mutex::new(AHashMap::new()),
        });

        let weak = Arc::downgrade(&inner);
        let listener: std::sync::Weak<dyn EvictionListener> = weak;
        inner.cache.set_eviction_listener(listener);

        Self { inner }
    }

    /// Sets the messenger notified about loaded and failed tiles.
    pub fn set_messenger(&self, messenger: Arc<dyn Messenger>) {
        *self.inner.messenger.write() = Some(messenger);
    }

    /// Registers the layer so that its tiles can be requested.
    pub fn register_layer(&self, id: LayerId, spec: &LayerSpec) {
        self.inner
            .layers
            .write()
            .insert(id, Arc::new(LayerSlot::new(spec)));
    }

    /// Cancels all requests of the layer and forgets about it.
    pub fn unregister_layer(&self, id: LayerId) {
        self.cancel_layer(id);
        if let Some(slot) = self.inner.layers.write().remove(&id) {
            slot.semaphore.close();
        }
    }

    /// Requests the tile unless it is already requested. A pending entry is put into the cache
    /// right away.
    pub fn fetch(&self, key: TileKey) {
        let Some(slot) = self.inner.layers.read().get(&key.layer).cloned() else {
            log::warn!("Tile {key} is requested for an unknown layer");
            return;
        };

        let flag = CancellationFlag::new();
        {
            let mut requests = self.inner.requests.lock();
            if requests.contains_key(&key) {
                return;
            }

            requests.insert(key, flag.clone());
        }

        self.inner
            .cache
            .put_unless_cancelled(TileEntry::new(key, TileState::Pending), &flag);

        let inner = self.inner.clone();
        let task_flag = flag.clone();
        let spawned = crate::async_runtime::spawn(self.inner.runtime.as_ref(), async move {
            Self::run(inner, slot, key, task_flag).await;
        });

        if spawned.is_none() {
            self.cancel(&key);
        }
    }

    /// Cancels the request for the tile. The pending entry of the tile is removed from the cache,
    /// a result that arrives later is discarded.
    pub fn cancel(&self, key: &TileKey) {
        let Some(flag) = self.inner.requests.lock().remove(key) else {
            return;
        };

        flag.cancel();
        let max_attempts = self.inner.config.max_attempts;
        self.inner.cache.remove_if(key, |state| match state {
            TileState::Pending => true,
            TileState::Failed { attempts } => *attempts < max_attempts,
            TileState::Ready(_) => false,
        });
        log::trace!("Cancelled request for tile {key}");
    }

    /// Cancels all requests of the layer.
    pub fn cancel_layer(&self, layer: LayerId) {
        let keys: Vec<TileKey> = self
            .inner
            .requests
            .lock()
            .keys()
            .filter(|key| key.layer == layer)
            .copied()
            .collect();

        for key in &keys {
            self.cancel(key);
        }
    }

    /// Returns true if the tile is requested and the request is not finished or cancelled.
    pub fn is_requested(&self, key: &TileKey) -> bool {
        self.inner.requests.lock().contains_key(key)
    }

    /// Number of unfinished requests of the layer, including the ones waiting for a free slot.
    pub fn requested_count(&self, layer: LayerId) -> usize {
        self.inner
            .requests
            .lock()
            .keys()
            .filter(|key| key.layer == layer)
            .count()
    }

    /// Number of requests of the layer that are currently loading.
    pub fn in_flight(&self, layer: LayerId) -> usize {
        self.inner
            .layers
            .read()
            .get(&layer)
            .map_or(0, |slot| slot.in_flight.load(Ordering::Acquire))
    }

    /// Highest number of simultaneously loading requests of the layer observed so far.
    pub fn peak_in_flight(&self, layer: LayerId) -> usize {
        self.inner
            .layers
            .read()
            .get(&layer)
            .map_or(0, |slot| slot.peak_in_flight.load(Ordering::Acquire))
    }

    async fn run(
        inner: Arc<FetcherInner>,
        slot: Arc<LayerSlot>,
        key: TileKey,
        flag: CancellationFlag,
    ) {
        let max_attempts = inner.config.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            let Ok(permit) = slot.semaphore.clone().acquire_owned().await else {
                break;
            };

            if flag.is_cancelled() {
                break;
            }

            let subdomain = slot.next_subdomain.fetch_add(1, Ordering::Relaxed);
            let url = match slot.url_template.url(key.index, subdomain) {
                Ok(url) => url,
                Err(err) => {
                    log::warn!("Cannot build url for tile {key}: {err}");
                    inner.cache.put_unless_cancelled(
                        TileEntry::new(key, TileState::Failed { attempts: max_attempts }),
                        &flag,
                    );
                    break;
                }
            };

            let loading = slot.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
            slot.peak_in_flight.fetch_max(loading, Ordering::AcqRel);

            let result = inner.loader.load(&url).await;

            slot.in_flight.fetch_sub(1, Ordering::AcqRel);
            drop(permit);

            match result {
                Ok(image) => {
                    let entry = TileEntry::new(key, TileState::Ready(Arc::new(image)));
                    if inner.cache.put_unless_cancelled(entry, &flag) {
                        log::trace!("Tile {key} loaded");
                        inner.notify(MapEvent::TileLoaded(key));
                    } else {
                        log::trace!("Tile {key} loaded after cancellation, discarding");
                    }

                    break;
                }
                Err(err) => {
                    let gave_up = attempt == max_attempts;
                    log::debug!("Failed to load tile {key} from {url} (attempt {attempt}): {err}");

                    let entry = TileEntry::new(key, TileState::Failed { attempts: attempt });
                    if !inner.cache.put_unless_cancelled(entry, &flag) {
                        break;
                    }

                    inner.notify(MapEvent::TileFailed {
                        key,
                        attempts: attempt,
                        gave_up,
                    });

                    if gave_up {
                        log::info!("Giving up on tile {key} after {attempt} attempts");
                        break;
                    }

                    tokio::time::sleep(inner.config.backoff(attempt)).await;
                }
            }
        }

        inner.finish(&key, &flag);
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use web_time::Duration;

    use super::*;
    use crate::tests::{fast_config, wait_until, TestLoader};
    use crate::tile_schema::TileIndex;

    fn spec(parallel_requests: usize) -> LayerSpec {
        crate::layer::RasterTileLayerBuilder::new("osm", "http://{s}.tile.test/{z}/{x}/{y}.png")
            .with_subdomains(["a", "b"])
            .with_parallel_requests(parallel_requests)
            .build()
            .unwrap()
    }

    fn key(x: i32) -> TileKey {
        TileKey::new(LayerId(0), TileIndex::new(x, 0, 5))
    }

    fn fetcher(
        loader: Arc<TestLoader>,
        parallel_requests: usize,
    ) -> (TileFetcher, Arc<TileCache>) {
        let cache = Arc::new(TileCache::new(100));
        let fetcher = TileFetcher::new(cache.clone(), loader, fast_config(), None);
        fetcher.register_layer(LayerId(0), &spec(parallel_requests));
        (fetcher, cache)
    }

    #[tokio::test]
    async fn loads_tile_into_cache() {
        let loader = Arc::new(TestLoader::default());
        let (fetcher, cache) = fetcher(loader.clone(), 2);

        fetcher.fetch(key(1));
        assert!(fetcher.is_requested(&key(1)));
        assert_matches!(cache.peek(&key(1)), Some(TileState::Pending | TileState::Ready(_)));

        wait_until(|| matches!(cache.peek(&key(1)), Some(TileState::Ready(_)))).await;
        wait_until(|| !fetcher.is_requested(&key(1))).await;
        assert_eq!(loader.calls(), 1);
    }

    #[tokio::test]
    async fn limits_parallel_requests() {
        let loader = Arc::new(TestLoader::with_delay(Duration::from_millis(20)));
        let (fetcher, cache) = fetcher(loader.clone(), 2);

        for x in 0..10 {
            fetcher.fetch(key(x));
        }

        wait_until(|| (0..10).all(|x| matches!(cache.peek(&key(x)), Some(TileState::Ready(_)))))
            .await;
        assert_eq!(loader.calls(), 10);
        assert!(loader.peak.load(Ordering::Acquire) <= 2);
        assert!(fetcher.peak_in_flight(LayerId(0)) <= 2);
        assert_eq!(fetcher.in_flight(LayerId(0)), 0);
    }

    #[tokio::test]
    async fn round_robins_subdomains() {
        let loader = Arc::new(TestLoader::default());
        let (fetcher, cache) = fetcher(loader.clone(), 1);

        for x in 0..4 {
            fetcher.fetch(key(x));
        }

        wait_until(|| (0..4).all(|x| matches!(cache.peek(&key(x)), Some(TileState::Ready(_)))))
            .await;
        let urls = loader.urls.lock();
        let on_a = urls.iter().filter(|u| u.starts_with("http://a.")).count();
        let on_b = urls.iter().filter(|u| u.starts_with("http://b.")).count();
        assert_eq!((on_a, on_b), (2, 2));
    }

    #[tokio::test]
    async fn retries_and_gives_up() {
        let loader = Arc::new(TestLoader::failing("tile.test"));
        let (fetcher, cache) = fetcher(loader.clone(), 2);

        fetcher.fetch(key(0));
        wait_until(|| matches!(cache.peek(&key(0)), Some(TileState::Failed { attempts: 3 }))).await;
        wait_until(|| !fetcher.is_requested(&key(0))).await;

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(loader.calls(), 3);
    }

    #[tokio::test]
    async fn cancelled_request_does_not_populate_cache() {
        let loader = Arc::new(TestLoader::with_delay(Duration::from_millis(30)));
        let (fetcher, cache) = fetcher(loader.clone(), 1);

        fetcher.fetch(key(0));
        fetcher.fetch(key(1));
        fetcher.cancel(&key(1));
        assert!(cache.peek(&key(1)).is_none());
        assert!(!fetcher.is_requested(&key(1)));

        wait_until(|| matches!(cache.peek(&key(0)), Some(TileState::Ready(_)))).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(cache.peek(&key(1)).is_none());
        assert_eq!(loader.calls(), 1);
    }

    #[tokio::test]
    async fn evicted_pending_request_is_cancelled() {
        let loader = Arc::new(TestLoader::with_delay(Duration::from_millis(30)));
        let cache = Arc::new(TileCache::new(1));
        let fetcher = TileFetcher::new(cache.clone(), loader.clone(), fast_config(), None);
        fetcher.register_layer(LayerId(0), &spec(1));

        fetcher.fetch(key(0));
        fetcher.fetch(key(1));
        assert!(!fetcher.is_requested(&key(0)));
        assert!(fetcher.is_requested(&key(1)));

        wait_until(|| matches!(cache.peek(&key(1)), Some(TileState::Ready(_)))).await;
        assert!(cache.peek(&key(0)).is_none());
    }
}
