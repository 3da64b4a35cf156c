/// Reference entities loaded into the catalog cache
use super::geo::BoundingBox;
use super::locale::LocalizedText;
use crate::{CatalogError, CatalogResult};
use geo::BoundingRect;
use geo_types::{Coord, LineString, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference entity families served by the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Species,
    Disease,
    Region,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Species => "species",
            EntityType::Disease => "disease",
            EntityType::Region => "region",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mosquito species record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Species {
    /// Stable slug, e.g. "aedes-aegypti"
    pub id: String,
    pub scientific_name: String,
    #[serde(default)]
    pub common_names: LocalizedText,
    #[serde(default)]
    pub vector_embedding: Vec<f32>,
    /// Known vector of at least one disease
    #[serde(default)]
    pub is_vector: bool,
    #[serde(default)]
    pub region_ids: Vec<String>,
    #[serde(default)]
    pub disease_ids: Vec<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Disease transmitted by one or more vector species
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disease {
    pub id: String,
    #[serde(default)]
    pub names: LocalizedText,
    #[serde(default)]
    pub descriptions: LocalizedText,
    #[serde(default)]
    pub vector_species_ids: Vec<String>,
}

/// Country or region with its outline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: String,
    #[serde(default)]
    pub names: LocalizedText,
    pub geometry: RegionGeometry,
}

/// GeoJSON-shaped outline. Positions are `[longitude, latitude]`; the first ring of a
/// polygon is its exterior, any further rings are holes. Longitudes may run past ±180
/// so that shapes crossing the antimeridian stay contiguous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum RegionGeometry {
    Polygon(Vec<Vec<[f64; 2]>>),
    MultiPolygon(Vec<Vec<Vec<[f64; 2]>>>),
}

impl RegionGeometry {
    fn polygons(&self) -> Vec<&Vec<Vec<[f64; 2]>>> {
        match self {
            RegionGeometry::Polygon(rings) => vec![rings],
            RegionGeometry::MultiPolygon(polygons) => polygons.iter().collect(),
        }
    }

    /// Convert into a geo-types multipolygon, validating every ring
    pub fn to_multi_polygon(&self) -> CatalogResult<MultiPolygon<f64>> {
        let polygons = self.polygons();
        if polygons.is_empty() {
            return Err(CatalogError::validation("geometry has no polygons"));
        }

        let mut out = Vec::with_capacity(polygons.len());
        for rings in polygons {
            let mut rings = rings.iter();
            let exterior = match rings.next() {
                Some(ring) => ring_to_linestring(ring)?,
                None => return Err(CatalogError::validation("polygon has no exterior ring")),
            };
            let holes = rings
                .map(|ring| ring_to_linestring(ring))
                .collect::<CatalogResult<Vec<_>>>()?;
            out.push(Polygon::new(exterior, holes));
        }
        Ok(MultiPolygon::new(out))
    }

    /// Envelope of the outline. Longitudes are left unnormalised.
    pub fn bbox(&self) -> CatalogResult<BoundingBox> {
        let rect = self
            .to_multi_polygon()?
            .bounding_rect()
            .ok_or_else(|| CatalogError::validation("geometry has no extent"))?;
        Ok(BoundingBox {
            min_lat: rect.min().y,
            min_lon: rect.min().x,
            max_lat: rect.max().y,
            max_lon: rect.max().x,
        })
    }

    pub fn crosses_antimeridian(&self) -> bool {
        self.polygons()
            .iter()
            .flat_map(|rings| rings.iter())
            .flat_map(|ring| ring.iter())
            .any(|[lon, _]| lon.abs() > 180.0)
    }
}

fn ring_to_linestring(ring: &[[f64; 2]]) -> CatalogResult<LineString<f64>> {
    if ring.len() < 3 {
        return Err(CatalogError::validation(format!(
            "ring has {} positions, at least 3 required",
            ring.len()
        )));
    }
    for [lon, lat] in ring {
        if !lon.is_finite() || !lat.is_finite() {
            return Err(CatalogError::validation("ring contains non-finite coordinates"));
        }
        if !(-90.0..=90.0).contains(lat) || !(-360.0..=360.0).contains(lon) {
            return Err(CatalogError::validation(format!(
                "ring position [{}, {}] is out of range",
                lon, lat
            )));
        }
    }
    // Polygon::new closes open rings
    Ok(LineString::new(
        ring.iter().map(|[x, y]| Coord { x: *x, y: *y }).collect(),
    ))
}
