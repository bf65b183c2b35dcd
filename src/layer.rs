//! GeoJSON vector layers.
//!
//! A layer is a flat list of polygonal features with string attributes. The
//! source files are big (the combined timezone boundary release is a few
//! hundred megabytes), so files are memory-mapped and geometry conversion
//! fans out across cores, but the result is a plain in-memory `Vec` that the
//! generation passes iterate over in a fixed order.

use geo::{Area, BooleanOps, BoundingRect, Intersects, MultiPolygon, Rect};
use memmap2::Mmap;
use rayon::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Instant;

pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The layer file could not be opened or mapped.
    #[error("{1}: I/O error: {0}")]
    Io(std::io::Error, PathBuf),

    /// The layer file is not a GeoJSON feature collection.
    #[error("{layer} layer: not a GeoJSON feature collection: {source}")]
    Parse {
        layer: String,
        source: serde_json::Error,
    },

    /// A feature carries no geometry at all.
    #[error("{layer} layer, feature {index}: no geometry")]
    MissingGeometry { layer: String, index: usize },

    /// A feature's geometry could not be converted into coordinates.
    #[error("{layer} layer, feature {index}: invalid geometry: {source}")]
    Geometry {
        layer: String,
        index: usize,
        source: geojson::Error,
    },

    /// A feature's geometry is not a polygon or multi-polygon.
    #[error("{layer} layer, feature {index}: expected a polygon, found {found}")]
    NotPolygonal {
        layer: String,
        index: usize,
        found: &'static str,
    },
}

/// A polygonal shape with its derived measurements cached.
///
/// Area and bounding box get consulted once per candidate pair in the
/// quadratic matching passes, so both are computed exactly once, at load.
pub struct Shape {
    polygons: MultiPolygon<f64>,
    bounds: Option<Rect<f64>>,
    area: f64,
}

impl Shape {
    fn new(polygons: MultiPolygon<f64>) -> Self {
        let bounds = polygons.bounding_rect();
        let area = polygons.unsigned_area();
        Self {
            polygons,
            bounds,
            area,
        }
    }

    /// The planar area in squared layer units. Callers only ever compare
    /// ratios of these, so the unit itself does not matter.
    pub fn area(&self) -> f64 {
        self.area
    }

    /// Whether the two shapes share any point, boundary contact included.
    /// Disjoint bounding boxes settle the common case without touching the
    /// polygons.
    pub fn intersects(&self, other: &Self) -> bool {
        match (self.bounds, other.bounds) {
            (Some(a), Some(b)) => a.intersects(&b) && self.polygons.intersects(&other.polygons),
            _ => false,
        }
    }

    /// The area of the overlap between the two shapes. Zero when they only
    /// touch along a boundary.
    pub fn intersection_area(&self, other: &Self) -> f64 {
        self.polygons.intersection(&other.polygons).unsigned_area()
    }
}

/// One layer feature: attributes plus shape.
pub struct Feature {
    properties: geojson::JsonObject,
    shape: Shape,
}

impl Feature {
    fn convert(layer: &str, index: usize, feature: geojson::Feature) -> Result<Self> {
        let geometry = feature.geometry.ok_or_else(|| Error::MissingGeometry {
            layer: layer.into(),
            index,
        })?;
        let geometry = geo::Geometry::<f64>::try_from(geometry).map_err(|source| Error::Geometry {
            layer: layer.into(),
            index,
            source,
        })?;
        let polygons = match geometry {
            geo::Geometry::Polygon(polygon) => MultiPolygon::new(vec![polygon]),
            geo::Geometry::MultiPolygon(polygons) => polygons,
            other => {
                return Err(Error::NotPolygonal {
                    layer: layer.into(),
                    index,
                    found: geometry_kind(&other),
                });
            }
        };

        Ok(Self {
            properties: feature.properties.unwrap_or_default(),
            shape: Shape::new(polygons),
        })
    }

    /// Finds a string attribute by ASCII case-insensitive name. The host
    /// tooling this data comes from is case-insensitive about field names,
    /// and real exports disagree about the casing of `tzid`.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .find_map(|(key, value)| key.eq_ignore_ascii_case(name).then(|| value.as_str())?)
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }
}

/// A named collection of polygonal features.
pub struct Layer {
    name: String,
    features: Vec<Feature>,
}

impl Layer {
    /// Memory-maps and parses a layer file.
    pub fn from_file(name: &str, path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|err| Error::Io(err, path.into()))?;
        let data = unsafe { Mmap::map(&file) }.map_err(|err| Error::Io(err, path.into()))?;
        Self::from_json(name, &data)
    }

    /// Parses a layer from raw GeoJSON bytes.
    pub fn from_json(name: &str, data: &[u8]) -> Result<Self> {
        let start = Instant::now();
        let collection: geojson::FeatureCollection =
            serde_json::from_slice(data).map_err(|source| Error::Parse {
                layer: name.into(),
                source,
            })?;
        let features = collection
            .features
            .into_par_iter()
            .enumerate()
            .map(|(index, feature)| Feature::convert(name, index, feature))
            .collect::<Result<Vec<_>>>()?;
        log::trace!(
            "Loaded {} features into the {name} layer in {:.2?}",
            features.len(),
            start.elapsed()
        );

        Ok(Self {
            name: name.into(),
            features,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }
}

fn geometry_kind(geometry: &geo::Geometry<f64>) -> &'static str {
    match geometry {
        geo::Geometry::Point(_) | geo::Geometry::MultiPoint(_) => "a point",
        geo::Geometry::Line(_)
        | geo::Geometry::LineString(_)
        | geo::Geometry::MultiLineString(_) => "a line",
        geo::Geometry::GeometryCollection(_) => "a geometry collection",
        _ => "another kind of geometry",
    }
}
