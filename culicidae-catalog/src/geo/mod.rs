//! Point-in-region and bounding-box queries
//!
//! Boundaries are inclusive everywhere: a point on a region's outline (or on
//! the outline of one of its holes) is inside the region, and a point on a
//! bounding box edge is inside the box.

use crate::cache::{ReferenceCache, RegionView};
use culicidae_core::{BoundingBox, CatalogError, CatalogResult, EntityType, GeoPoint, Observation};
use culicidae_storage::{table_names, Gateway, StorageResult, TableHandle};
use std::cmp::Reverse;
use std::sync::Arc;
use tracing::debug;

pub struct GeoQueryService {
    cache: Arc<ReferenceCache>,
    gateway: Gateway,
}

/// Newest first, then id
pub(crate) fn sort_observations(observations: &mut [Observation]) {
    observations.sort_by_key(|o| (Reverse(o.created_at), o.id.clone()));
}

impl GeoQueryService {
    pub fn new(cache: Arc<ReferenceCache>, gateway: Gateway) -> Self {
        Self { cache, gateway }
    }

    fn observations(&self) -> StorageResult<TableHandle<Observation>> {
        self.gateway.open_table(table_names::OBSERVATIONS)
    }

    /// Ids of the regions containing the point, ascending
    pub fn regions_containing(&self, latitude: f64, longitude: f64) -> CatalogResult<Vec<String>> {
        let point = GeoPoint::new(latitude, longitude)?;
        let snapshot = self.cache.snapshot()?;
        Ok(snapshot
            .regions_containing(&point)
            .into_iter()
            .map(|r| r.region.id.clone())
            .collect())
    }

    /// Same as [`regions_containing`](Self::regions_containing) with locale-resolved views
    pub fn regions_at(
        &self,
        latitude: f64,
        longitude: f64,
        locale: Option<&str>,
    ) -> CatalogResult<Vec<RegionView>> {
        let point = GeoPoint::new(latitude, longitude)?;
        let snapshot = self.cache.snapshot()?;
        let locale = snapshot.resolve_locale(locale);
        Ok(snapshot
            .regions_containing(&point)
            .into_iter()
            .map(|r| snapshot.region_view(r, locale))
            .collect())
    }

    /// Envelope of a region in stored coordinates. Outlines crossing the
    /// antimeridian report the full longitude range.
    pub fn region_bbox(&self, region_id: &str) -> CatalogResult<BoundingBox> {
        let snapshot = self.cache.snapshot()?;
        snapshot
            .region_record(region_id)
            .map(|r| r.search_window())
            .ok_or_else(|| CatalogError::not_found(EntityType::Region.as_str(), region_id))
    }

    /// Observations located inside the box. The box is validated before the store is read.
    pub fn observations_in_bbox(&self, bbox: &BoundingBox) -> CatalogResult<Vec<Observation>> {
        bbox.validate()?;
        let mut rows = self
            .observations()?
            .scan_where(|o| bbox.contains(&o.location))?;
        sort_observations(&mut rows);
        debug!(matches = rows.len(), "bbox observation scan");
        Ok(rows)
    }

    /// Observations inside a region, optionally restricted to a caller box.
    /// The cached region envelope narrows the scan before exact containment.
    pub fn observations_in_region(
        &self,
        region_id: &str,
        bbox: Option<&BoundingBox>,
    ) -> CatalogResult<Vec<Observation>> {
        if let Some(bbox) = bbox {
            bbox.validate()?;
        }
        let snapshot = self.cache.snapshot()?;
        let region = snapshot
            .region_record(region_id)
            .ok_or_else(|| CatalogError::not_found(EntityType::Region.as_str(), region_id))?;

        let window = match bbox {
            Some(bbox) => match region.search_window().intersection(bbox) {
                Some(window) => window,
                None => {
                    debug!(region = region_id, "caller box is disjoint from region");
                    return Ok(Vec::new());
                }
            },
            None => region.search_window(),
        };

        let mut rows = self
            .observations()?
            .scan_where(|o| window.contains(&o.location) && region.contains(&o.location))?;
        sort_observations(&mut rows);
        debug!(region = region_id, matches = rows.len(), "region observation scan");
        Ok(rows)
    }
}
