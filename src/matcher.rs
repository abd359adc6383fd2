// 🎯 Building Matcher - registry points → footprints
//
// Bounding-box candidates first, then the exact containment test. Points on
// the polygon boundary count as contained.

use crate::footprint::Footprint;
use crate::spatial::CoordinateIndex;
use crate::translate::TranslatedRecord;
use geo::coordinate_position::{CoordPos, CoordinatePosition};
use geo::{Coord, Polygon};
use rayon::prelude::*;
use tracing::debug;

/// Boundary-inclusive point-in-polygon. Interior rings are holes.
pub fn contains_point(polygon: &Polygon<f64>, e: f64, n: f64) -> bool {
    polygon.coordinate_position(&Coord { x: e, y: n }) != CoordPos::Outside
}

/// Registry records matched to one footprint.
#[derive(Debug, Clone)]
pub struct FootprintMatch<'a> {
    pub footprint: &'a Footprint,
    pub records: Vec<&'a TranslatedRecord>,
}

pub struct Matcher<'a> {
    records: &'a [TranslatedRecord],
    index: CoordinateIndex,
}

impl<'a> Matcher<'a> {
    pub fn new(records: &'a [TranslatedRecord]) -> Self {
        Matcher {
            records,
            index: CoordinateIndex::new(records),
        }
    }

    /// Records inside the footprint, in registry order. A record may match
    /// several footprints when polygons overlap.
    pub fn match_footprint(&self, footprint: &'a Footprint) -> FootprintMatch<'a> {
        let candidates = self.index.query(&footprint.bbox);

        let records: Vec<&'a TranslatedRecord> = candidates
            .into_iter()
            .map(|i| &self.records[i])
            .filter(|r| contains_point(&footprint.polygon, r.e(), r.n()))
            .collect();

        debug!(footprint = %footprint.name, matched = records.len(), "matched footprint");

        FootprintMatch { footprint, records }
    }

    /// Match every footprint. Output order follows `footprints` whether or
    /// not the work is spread over the rayon pool.
    pub fn match_all(&self, footprints: &'a [Footprint], parallel: bool) -> Vec<FootprintMatch<'a>> {
        if parallel {
            footprints
                .par_iter()
                .map(|fp| self.match_footprint(fp))
                .collect()
        } else {
            footprints.iter().map(|fp| self.match_footprint(fp)).collect()
        }
    }
}
