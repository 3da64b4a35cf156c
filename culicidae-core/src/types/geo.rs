/// Geographic primitives with validated coordinates
use crate::{CatalogError, CatalogResult};
use serde::{Deserialize, Serialize};

/// WGS84 point. Construction through `new` guarantees valid ranges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Validate and build a point. Out-of-range or non-finite values are rejected, never clamped.
    pub fn new(latitude: f64, longitude: f64) -> CatalogResult<Self> {
        validate_latitude(latitude)?;
        validate_longitude(longitude)?;
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn validate(&self) -> CatalogResult<()> {
        validate_latitude(self.latitude)?;
        validate_longitude(self.longitude)
    }
}

pub fn validate_latitude(latitude: f64) -> CatalogResult<()> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(CatalogError::validation(format!(
            "latitude {} is outside [-90, 90]",
            latitude
        )));
    }
    Ok(())
}

pub fn validate_longitude(longitude: f64) -> CatalogResult<()> {
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(CatalogError::validation(format!(
            "longitude {} is outside [-180, 180]",
            longitude
        )));
    }
    Ok(())
}

/// Axis-aligned box in degrees. Boundaries are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Build a validated box. Inverted boxes are rejected rather than swapped.
    pub fn new(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> CatalogResult<Self> {
        let bbox = Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        };
        bbox.validate()?;
        Ok(bbox)
    }

    pub fn validate(&self) -> CatalogResult<()> {
        validate_latitude(self.min_lat)?;
        validate_latitude(self.max_lat)?;
        validate_longitude(self.min_lon)?;
        validate_longitude(self.max_lon)?;
        if self.min_lat > self.max_lat {
            return Err(CatalogError::validation(format!(
                "inverted bounding box: min_lat {} > max_lat {}",
                self.min_lat, self.max_lat
            )));
        }
        if self.min_lon > self.max_lon {
            return Err(CatalogError::validation(format!(
                "inverted bounding box: min_lon {} > max_lon {}",
                self.min_lon, self.max_lon
            )));
        }
        Ok(())
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        point.latitude >= self.min_lat
            && point.latitude <= self.max_lat
            && point.longitude >= self.min_lon
            && point.longitude <= self.max_lon
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_lat <= other.max_lat
            && self.max_lat >= other.min_lat
            && self.min_lon <= other.max_lon
            && self.max_lon >= other.min_lon
    }

    /// Overlap of two boxes, `None` when disjoint
    pub fn intersection(&self, other: &BoundingBox) -> Option<BoundingBox> {
        if !self.intersects(other) {
            return None;
        }
        Some(BoundingBox {
            min_lat: self.min_lat.max(other.min_lat),
            min_lon: self.min_lon.max(other.min_lon),
            max_lat: self.max_lat.min(other.max_lat),
            max_lon: self.max_lon.min(other.max_lon),
        })
    }

    /// The whole globe
    pub fn world() -> Self {
        Self {
            min_lat: -90.0,
            min_lon: -180.0,
            max_lat: 90.0,
            max_lon: 180.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_validation() {
        assert!(GeoPoint::new(40.7128, -74.0060).is_ok());
        assert!(GeoPoint::new(90.0, 180.0).is_ok());
        assert!(GeoPoint::new(-90.0, -180.0).is_ok());

        assert!(matches!(
            GeoPoint::new(90.0001, 0.0),
            Err(CatalogError::Validation(_))
        ));
        assert!(GeoPoint::new(0.0, -180.5).is_err());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
        assert!(GeoPoint::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_bbox_rejects_inverted() {
        let err = BoundingBox::new(10.0, 0.0, 5.0, 1.0).unwrap_err();
        assert!(err.to_string().contains("min_lat"));

        let err = BoundingBox::new(0.0, 10.0, 1.0, 5.0).unwrap_err();
        assert!(err.to_string().contains("min_lon"));

        assert!(BoundingBox::new(-91.0, 0.0, 0.0, 1.0).is_err());
    }

    #[test]
    fn test_bbox_contains_is_inclusive() {
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0).unwrap();
        assert!(bbox.contains(&GeoPoint::new(0.0, 0.0).unwrap()));
        assert!(bbox.contains(&GeoPoint::new(10.0, 10.0).unwrap()));
        assert!(bbox.contains(&GeoPoint::new(5.0, 10.0).unwrap()));
        assert!(!bbox.contains(&GeoPoint::new(10.0001, 5.0).unwrap()));
    }

    #[test]
    fn test_bbox_intersection() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0).unwrap();
        let b = BoundingBox::new(5.0, 5.0, 15.0, 15.0).unwrap();
        let c = BoundingBox::new(20.0, 20.0, 30.0, 30.0).unwrap();

        let overlap = a.intersection(&b).unwrap();
        assert_eq!(overlap, BoundingBox::new(5.0, 5.0, 10.0, 10.0).unwrap());
        assert!(a.intersection(&c).is_none());

        // Touching edges still intersect
        let d = BoundingBox::new(10.0, 10.0, 12.0, 12.0).unwrap();
        assert!(a.intersects(&d));
    }
}
