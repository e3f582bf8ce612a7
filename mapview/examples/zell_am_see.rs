//! Renders a map of Zell am See with an OSM background and a few overlays to a PNG file.
//!
//! ```shell
//! cargo run --example zell_am_see -- zell_am_see.png
//! ```

use std::time::Duration;

use anyhow::Result;
use mapview::layer::TileState;
use mapview::mapview_types::cartesian::Size;
use mapview::{DummyMessenger, EngineConfig, Map, MapBuilder};
use serde_json::json;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let output = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "zell_am_see.png".to_string());

    let mut map = MapBuilder::new()
        .with_options(serde_json::from_value(json!({
            "scalebar": true,
            "center": [47.32, 12.79],
            "zoomlevel": "12",
            "debug": true
        }))?)
        .with_messenger(DummyMessenger)
        .build()?;

    map.add_layer_options(json!({
        "name": "osm",
        "url": "http://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png",
        "subdomains": ["a", "b"],
        "parallelRequests": 2,
        "maxZoom": "18",
        "minZoom": "12"
    }))?;
    map.start_layer("osm")?;

    map.draw_polyline_options(json!({
        "coordinates": [[47.33, 12.76], [47.33, 12.78], [47.35, 12.77]],
        "color": "blue",
        "strokeWidth": 5
    }))?;
    map.draw_polygon_options(json!({
        "coordinates": [
            [47.3045, 12.7345],
            [47.3045, 12.7545],
            [47.3235, 12.7545],
            [47.3235, 12.7345],
            [47.3045, 12.7345]
        ],
        "fillColor": "green",
        "strokeColor": "black",
        "strokeWidth": 5
    }))?;
    map.draw_marker_options(json!({
        "iconPath": "http://www.google.com/mapfiles/marker.png",
        "coordinates": [47.3100, 12.7300]
    }))?;
    map.draw_marker_options(json!({
        "iconPath": "http://www.google.com/mapfiles/dd-start.png",
        "coordinates": [47.3100, 12.7300],
        "hOffset": 5,
        "vOffset": 4
    }))?;
    map.draw_circle_options(json!({
        "coordinates": [47.2920, 12.7830],
        "fillColor": "blue",
        "strokeColor": "red",
        "radius": 500
    }))?;

    // The layer start above is queued until the map gets its size.
    map.attach(Size::new(1024.0, 768.0))?;

    wait_for_data(&map, EngineConfig::default().max_attempts, Duration::from_secs(30)).await;

    map.render().save(&output)?;
    log::info!("Map is saved to {output}");

    Ok(())
}

/// A tile is settled once it is loaded or failed for the last time. Failed tiles with attempts
/// left are still being retried.
fn is_settled(state: Option<TileState>, max_attempts: u32) -> bool {
    match state {
        Some(TileState::Ready(_)) => true,
        Some(TileState::Failed { attempts }) => attempts >= max_attempts,
        Some(TileState::Pending) | None => false,
    }
}

async fn wait_for_data(map: &Map, max_attempts: u32, timeout: Duration) {
    let started = std::time::Instant::now();
    while started.elapsed() < timeout {
        let layers = map.layers();
        let tiles_done = layers.layers().iter().all(|layer| {
            layers
                .required_tiles(layer.id())
                .into_iter()
                .flatten()
                .all(|key| is_settled(layers.cache().peek(key), max_attempts))
        });
        let icons_done = map.overlays().markers().all(|marker| {
            map.icons().get(marker.icon()).is_some() || map.icons().is_failed(marker.icon())
        });

        if tiles_done && icons_done {
            return;
        }

        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    log::warn!("Not all tiles and icons are loaded in {timeout:?}, rendering what is there");
}
