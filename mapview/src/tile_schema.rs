//! [`TileSchema`] is used by tile layers to calculate [tile indices](TileIndex) needed for a given [`MapView`].

use mapview_types::cartesian::{CartesianPoint2d, Point2d, Rect};
use mapview_types::geo::{GeoPoint, WebMercator};
use serde::{Deserialize, Serialize};

use crate::view::{MapView, MAX_ZOOM};

/// Tile index with additional virtual `display_x` index that is used to wrap tiles
/// over 180 longitude line.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, Serialize, Deserialize)]
pub struct WrappingTileIndex {
    /// Z index.
    pub z: u8,
    /// X index.
    pub x: i32,
    /// Y index.
    pub y: i32,
    /// Virtual wrapping X index. Used only for positioning the tile on the screen.
    pub display_x: i32,
}

impl WrappingTileIndex {
    /// Create a new index instance without wrapping.
    pub fn new(x: i32, y: i32, z: u8) -> Self {
        Self {
            x,
            y,
            z,
            display_x: x,
        }
    }
}

/// Tile index in the standard slippy map layout: `(0, 0)` is the north-west tile and `y` grows
/// to the south.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Hash, Serialize, Deserialize)]
pub struct TileIndex {
    /// Z index.
    pub z: u8,
    /// X index.
    pub x: i32,
    /// Y index.
    pub y: i32,
}

impl TileIndex {
    /// Create a new index instance.
    pub fn new(x: i32, y: i32, z: u8) -> Self {
        Self { x, y, z }
    }

    /// Converts the tile index into a wrapping tile index by setting `display_x` equal to `x`.
    pub fn into_wrapping(&self) -> WrappingTileIndex {
        WrappingTileIndex::new(self.x, self.y, self.z)
    }

    /// Tile of the previous zoom level that contains this tile.
    pub fn parent(&self) -> Option<TileIndex> {
        if self.z == 0 {
            return None;
        }

        Some(Self::new(
            self.x.div_euclid(2),
            self.y.div_euclid(2),
            self.z - 1,
        ))
    }

    /// Four tiles of the next zoom level covering the same area, in row order.
    pub fn children(&self) -> Option<[TileIndex; 4]> {
        if self.z >= MAX_ZOOM {
            return None;
        }

        let (x, y, z) = (self.x * 2, self.y * 2, self.z + 1);
        Some([
            Self::new(x, y, z),
            Self::new(x + 1, y, z),
            Self::new(x, y + 1, z),
            Self::new(x + 1, y + 1, z),
        ])
    }

    /// Returns true if the index is within the world at its zoom level.
    pub fn is_valid(&self) -> bool {
        let count = tiles_per_side(self.z);
        self.z <= MAX_ZOOM && (0..count).contains(&self.x) && (0..count).contains(&self.y)
    }
}

impl From<WrappingTileIndex> for TileIndex {
    fn from(value: WrappingTileIndex) -> Self {
        Self {
            x: value.x,
            y: value.y,
            z: value.z,
        }
    }
}

/// Position of a geographic point in tile units. The integer part is the tile index, the
/// fractional part is the position inside the tile.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FractionalTileIndex {
    /// Zoom level.
    pub z: u8,
    /// Fractional X.
    pub x: f64,
    /// Fractional Y.
    pub y: f64,
}

impl FractionalTileIndex {
    /// Index of the tile containing the point.
    pub fn floor(&self) -> TileIndex {
        let max = tiles_per_side(self.z) - 1;
        TileIndex::new(
            (self.x.floor() as i32).clamp(0, max),
            (self.y.floor() as i32).clamp(0, max),
            self.z,
        )
    }
}

fn tiles_per_side(z: u8) -> i32 {
    1 << z.min(MAX_ZOOM)
}

/// Tile schema specifies how tile indices are calculated based on the map position and zoom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileSchema {
    projection: WebMercator,
}

impl Default for TileSchema {
    fn default() -> Self {
        Self::web()
    }
}

impl TileSchema {
    /// Standard Web Mercator based tile scheme with 256 pixel tiles (used, for example, by OSM
    /// and Google maps).
    pub fn web() -> Self {
        Self {
            projection: WebMercator::default(),
        }
    }

    /// Width and height of a single tile in pixels.
    pub fn tile_size(&self) -> u32 {
        self.projection.tile_size()
    }

    /// Fractional tile position of a geographic point at the given zoom.
    pub fn geo_to_tile(&self, point: &impl GeoPoint, zoom: u8) -> FractionalTileIndex {
        let pixel = self.projection.project(point, zoom);
        let tile_size = self.tile_size() as f64;
        FractionalTileIndex {
            z: zoom,
            x: pixel.x() / tile_size,
            y: pixel.y() / tile_size,
        }
    }

    /// Rectangle of the tile in the world pixel plane of its zoom level.
    pub fn tile_world_rect(&self, index: WrappingTileIndex) -> Rect {
        let tile_size = self.tile_size() as f64;
        Rect::from_origin(
            Point2d::new(
                index.display_x as f64 * tile_size,
                index.y as f64 * tile_size,
            ),
            tile_size,
            tile_size,
        )
    }

    /// Rectangle of the tile on the screen of the given view.
    pub fn tile_screen_rect(&self, index: WrappingTileIndex, view: &MapView) -> Rect {
        let world = self.tile_world_rect(index);
        let min = view.world_to_screen(Point2d::new(world.x_min(), world.y_min()));
        Rect::from_origin(min, world.width(), world.height())
    }

    /// Iterate over tile indices that should be displayed for the given map view.
    ///
    /// Returns `None` if the view has no size yet. Tiles to the east or west of the world
    /// bounds are returned with wrapped `x` and the original `display_x`.
    pub fn iter_tiles(&self, view: &MapView) -> Option<impl Iterator<Item = WrappingTileIndex>> {
        if !view.has_size() {
            return None;
        }

        let bbox = view.world_pixel_rect();
        let tile_size = self.tile_size() as f64;
        let z = view.zoom();
        let count = tiles_per_side(z);

        let x_min = (bbox.x_min() / tile_size).floor() as i32;
        let x_max = (bbox.x_max() / tile_size).ceil() as i32 - 1;
        let y_min = ((bbox.y_min() / tile_size).floor() as i32).max(0);
        let y_max = ((bbox.y_max() / tile_size).ceil() as i32 - 1).min(count - 1);

        Some((x_min..=x_max).flat_map(move |display_x| {
            (y_min..=y_max).map(move |y| WrappingTileIndex {
                x: display_x.rem_euclid(count),
                y,
                z,
                display_x,
            })
        }))
    }
}
