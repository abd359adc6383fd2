// 📦 Spatial Indexer/Filter - inclusive bounding-box culling
//
// Coarse step only: never rejects a point the exact containment test would
// accept. A linear scan over precomputed coordinate arrays is enough at
// registry scale (~10^6 rows).

use crate::registry::RegistryRecord;
use crate::translate::TranslatedRecord;
use geo::{BoundingRect, Polygon};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box, bounds inclusive on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub minx: f64,
    pub miny: f64,
    pub maxx: f64,
    pub maxy: f64,
}

impl BoundingBox {
    pub fn new(minx: f64, miny: f64, maxx: f64, maxy: f64) -> Self {
        BoundingBox {
            minx,
            miny,
            maxx,
            maxy,
        }
    }

    /// `None` for an empty polygon.
    pub fn of_polygon(polygon: &Polygon<f64>) -> Option<Self> {
        polygon
            .bounding_rect()
            .map(|rect| BoundingBox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y))
    }

    pub fn contains(&self, e: f64, n: f64) -> bool {
        self.minx <= e && e <= self.maxx && self.miny <= n && n <= self.maxy
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox::new(
            self.minx.min(other.minx),
            self.miny.min(other.miny),
            self.maxx.max(other.maxx),
            self.maxy.max(other.maxy),
        )
    }
}

/// Union of all boxes, `None` when there are none.
pub fn total_bounds<'a, I>(boxes: I) -> Option<BoundingBox>
where
    I: IntoIterator<Item = &'a BoundingBox>,
{
    boxes.into_iter().fold(None, |acc, bbox| match acc {
        Some(total) => Some(bbox.union(&total)),
        None => Some(*bbox),
    })
}

// ============================================================================
// LOCATED RECORDS
// ============================================================================

/// Anything with planar registry coordinates.
pub trait Located {
    fn easting(&self) -> f64;
    fn northing(&self) -> f64;
}

impl Located for RegistryRecord {
    fn easting(&self) -> f64 {
        self.e
    }

    fn northing(&self) -> f64 {
        self.n
    }
}

impl Located for TranslatedRecord {
    fn easting(&self) -> f64 {
        self.e()
    }

    fn northing(&self) -> f64 {
        self.n()
    }
}

/// Keep the items inside `bbox`, preserving order.
pub fn filter_by_bounds<T: Located>(items: Vec<T>, bbox: &BoundingBox) -> Vec<T> {
    items
        .into_iter()
        .filter(|item| bbox.contains(item.easting(), item.northing()))
        .collect()
}

// ============================================================================
// COORDINATE INDEX
// ============================================================================

/// Column-wise copy of the record coordinates for repeated box queries.
#[derive(Debug, Clone, Default)]
pub struct CoordinateIndex {
    e: Vec<f64>,
    n: Vec<f64>,
}

impl CoordinateIndex {
    pub fn new<T: Located>(items: &[T]) -> Self {
        CoordinateIndex {
            e: items.iter().map(Located::easting).collect(),
            n: items.iter().map(Located::northing).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.e.len()
    }

    pub fn is_empty(&self) -> bool {
        self.e.is_empty()
    }

    /// Indices of the points inside `bbox`, ascending.
    pub fn query(&self, bbox: &BoundingBox) -> Vec<usize> {
        self.e
            .iter()
            .zip(&self.n)
            .enumerate()
            .filter(|(_, (e, n))| bbox.contains(**e, **n))
            .map(|(i, _)| i)
            .collect()
    }
}
