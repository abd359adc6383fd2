// 🏠 Footprints - target building polygons
//
// Geometry files are produced upstream (reprojection included). This module
// reads the exchange format and refuses coordinates in the wrong system.

use crate::error::{MapperError, MapperResult};
use crate::spatial::BoundingBox;
use geo::{Coord, LineString, Polygon};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// One target building. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Footprint {
    pub name: String,
    pub polygon: Polygon<f64>,
    pub bbox: BoundingBox,
}

impl Footprint {
    pub fn new(name: impl Into<String>, polygon: Polygon<f64>) -> MapperResult<Self> {
        let name = name.into();

        if polygon.exterior().0.len() < 4 {
            return Err(MapperError::InvalidFootprint {
                name,
                reason: "exterior ring needs at least three distinct points".to_string(),
            });
        }

        let finite = polygon
            .exterior()
            .coords()
            .chain(polygon.interiors().iter().flat_map(|ring| ring.coords()))
            .all(|c| c.x.is_finite() && c.y.is_finite());
        if !finite {
            return Err(MapperError::InvalidFootprint {
                name,
                reason: "non-finite coordinate".to_string(),
            });
        }

        let bbox = BoundingBox::of_polygon(&polygon).ok_or_else(|| MapperError::InvalidFootprint {
            name: name.clone(),
            reason: "empty geometry".to_string(),
        })?;

        Ok(Footprint { name, polygon, bbox })
    }
}

// ============================================================================
// EXCHANGE FORMAT
// ============================================================================

/// `{"crs": 2056, "buildings": [{"name": "B1001", "exterior": [[x, y], ...]}]}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FootprintFile {
    /// EPSG code of the coordinates
    #[serde(default)]
    pub crs: Option<u32>,

    pub buildings: Vec<FootprintFeature>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FootprintFeature {
    pub name: String,
    pub exterior: Vec<[f64; 2]>,

    #[serde(default)]
    pub interiors: Vec<Vec<[f64; 2]>>,
}

fn ring(points: &[[f64; 2]]) -> LineString<f64> {
    LineString::new(points.iter().map(|[x, y]| Coord { x: *x, y: *y }).collect())
}

impl FootprintFile {
    /// Build footprints in file order. Names must be unique.
    pub fn into_footprints(self, expected_crs: u32) -> MapperResult<Vec<Footprint>> {
        match self.crs {
            Some(found) if found != expected_crs => {
                return Err(MapperError::CrsMismatch {
                    expected: expected_crs,
                    found,
                });
            }
            None => warn!(expected_crs, "footprint file declares no CRS, assuming registry system"),
            _ => {}
        }

        let mut names = HashSet::new();
        let mut footprints = Vec::with_capacity(self.buildings.len());

        for feature in self.buildings {
            if !names.insert(feature.name.clone()) {
                return Err(MapperError::DuplicateFootprint(feature.name));
            }

            let interiors = feature.interiors.iter().map(|r| ring(r)).collect();
            let polygon = Polygon::new(ring(&feature.exterior), interiors);
            footprints.push(Footprint::new(feature.name, polygon)?);
        }

        Ok(footprints)
    }
}

pub fn parse_footprints(json: &str, expected_crs: u32) -> MapperResult<Vec<Footprint>> {
    let file: FootprintFile = serde_json::from_str(json)?;
    file.into_footprints(expected_crs)
}

pub fn load_footprints<P: AsRef<Path>>(path: P, expected_crs: u32) -> MapperResult<Vec<Footprint>> {
    let content = fs::read_to_string(path.as_ref())?;
    let footprints = parse_footprints(&content, expected_crs)?;
    info!(
        path = %path.as_ref().display(),
        footprints = footprints.len(),
        "loaded footprints"
    );
    Ok(footprints)
}
