//! Geometry, envelope and coordinate reference system models

use std::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CrsError;

const EARTH_RADIUS_M: f64 = 6_378_137.0;
const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

/// A coordinate reference system code, e.g. `EPSG:4326`
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Crs(String);

impl Crs {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Geographic WGS84 (lon/lat degrees)
    pub fn wgs84() -> Self {
        Self::new("EPSG:4326")
    }

    /// Spherical Web Mercator (metres)
    pub fn web_mercator() -> Self {
        Self::new("EPSG:3857")
    }

    pub fn code(&self) -> &str {
        &self.0
    }

    fn is_wgs84(&self) -> bool {
        self.0.eq_ignore_ascii_case("EPSG:4326") || self.0.eq_ignore_ascii_case("CRS:84")
    }

    fn is_web_mercator(&self) -> bool {
        self.0.eq_ignore_ascii_case("EPSG:3857") || self.0.eq_ignore_ascii_case("EPSG:900913")
    }
}

impl PartialEq for Crs {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Axis-aligned bounding box with its reference system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    pub crs: Crs,
}

impl Envelope {
    /// Build an envelope from two x and two y ordinates, in any order
    pub fn new(x1: f64, x2: f64, y1: f64, y2: f64, crs: Crs) -> Self {
        Self {
            min_x: x1.min(x2),
            max_x: x1.max(x2),
            min_y: y1.min(y2),
            max_y: y1.max(y2),
            crs,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Grow this envelope to cover `other`; both must share a CRS
    pub fn expand_to_include(&mut self, other: &Envelope) -> Result<(), CrsError> {
        if self.crs != other.crs {
            return Err(CrsError::Mismatch {
                left: self.crs.to_string(),
                right: other.crs.to_string(),
            });
        }
        self.min_x = self.min_x.min(other.min_x);
        self.max_x = self.max_x.max(other.max_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_y = self.max_y.max(other.max_y);
        Ok(())
    }

    /// Union of envelopes sharing a CRS; `None` for an empty input
    pub fn union<'a>(
        envelopes: impl IntoIterator<Item = &'a Envelope>,
    ) -> Result<Option<Envelope>, CrsError> {
        let mut acc: Option<Envelope> = None;
        for env in envelopes {
            match acc.as_mut() {
                Some(a) => a.expand_to_include(env)?,
                None => acc = Some(env.clone()),
            }
        }
        Ok(acc)
    }

    /// Whether the two boxes overlap (touching edges count)
    pub fn intersects(&self, other: &Envelope) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    /// Reproject into `target`.
    ///
    /// Supports identity and WGS84 <-> Web Mercator. Both transforms are
    /// monotonic per axis, so transforming the corners gives the exact box.
    pub fn reproject(&self, target: &Crs) -> Result<Envelope, CrsError> {
        if &self.crs == target {
            return Ok(self.clone());
        }
        let transform: fn(f64, f64) -> (f64, f64) =
            if self.crs.is_wgs84() && target.is_web_mercator() {
                lonlat_to_mercator
            } else if self.crs.is_web_mercator() && target.is_wgs84() {
                mercator_to_lonlat
            } else {
                return Err(CrsError::UnsupportedTransform {
                    from: self.crs.to_string(),
                    to: target.to_string(),
                });
            };
        let (x1, y1) = transform(self.min_x, self.min_y);
        let (x2, y2) = transform(self.max_x, self.max_y);
        Ok(Envelope::new(x1, x2, y1, y2, target.clone()))
    }
}

fn lonlat_to_mercator(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
    let x = EARTH_RADIUS_M * lon.to_radians();
    let y = EARTH_RADIUS_M * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln();
    (x, y)
}

fn mercator_to_lonlat(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / EARTH_RADIUS_M).to_degrees();
    let lat = (2.0 * (y / EARTH_RADIUS_M).exp().atan() - PI / 2.0).to_degrees();
    (lon, lat)
}

/// A position as `[x, y]`
pub type Coord = [f64; 2];

/// Simple-features geometry, GeoJSON shaped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Coord),
    LineString(Vec<Coord>),
    Polygon(Vec<Vec<Coord>>),
    MultiPolygon(Vec<Vec<Vec<Coord>>>),
}

impl Geometry {
    /// Axis-aligned rectangle polygon, handy for fixtures
    pub fn rectangle(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Geometry::Polygon(vec![vec![
            [min_x, min_y],
            [max_x, min_y],
            [max_x, max_y],
            [min_x, max_y],
            [min_x, min_y],
        ]])
    }

    fn coords(&self) -> Box<dyn Iterator<Item = &Coord> + '_> {
        match self {
            Geometry::Point(c) => Box::new(std::iter::once(c)),
            Geometry::LineString(line) => Box::new(line.iter()),
            Geometry::Polygon(rings) => Box::new(rings.iter().flatten()),
            Geometry::MultiPolygon(polys) => Box::new(polys.iter().flatten().flatten()),
        }
    }

    /// Bounding box of all vertices; `None` for a geometry without vertices
    pub fn envelope(&self, crs: &Crs) -> Option<Envelope> {
        let mut coords = self.coords();
        let first = coords.next()?;
        let mut env = Envelope::new(first[0], first[0], first[1], first[1], crs.clone());
        for c in coords {
            env.min_x = env.min_x.min(c[0]);
            env.max_x = env.max_x.max(c[0]);
            env.min_y = env.min_y.min(c[1]);
            env.max_y = env.max_y.max(c[1]);
        }
        Some(env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crs_equality_ignores_case() {
        assert_eq!(Crs::new("epsg:4326"), Crs::wgs84());
        assert_ne!(Crs::wgs84(), Crs::web_mercator());
    }

    #[test]
    fn union_takes_component_extremes() {
        let a = Envelope::new(-2.0, 2.0, -1.0, 6.0, Crs::wgs84());
        let b = Envelope::new(2.0, 4.0, 2.0, 4.0, Crs::wgs84());
        let u = Envelope::union([&a, &b]).unwrap().unwrap();
        assert_eq!(u, Envelope::new(-2.0, 4.0, -1.0, 6.0, Crs::wgs84()));
    }

    #[test]
    fn union_of_nothing_is_empty() {
        assert_eq!(Envelope::union(std::iter::empty()).unwrap(), None);
    }

    #[test]
    fn union_rejects_mixed_crs() {
        let a = Envelope::new(0.0, 1.0, 0.0, 1.0, Crs::wgs84());
        let b = Envelope::new(0.0, 1.0, 0.0, 1.0, Crs::web_mercator());
        assert!(matches!(
            Envelope::union([&a, &b]),
            Err(CrsError::Mismatch { .. })
        ));
    }

    #[test]
    fn mercator_round_trip_is_close() {
        let env = Envelope::new(-10.0, 20.0, -30.0, 45.0, Crs::wgs84());
        let merc = env.reproject(&Crs::web_mercator()).unwrap();
        assert!((merc.max_x - 2_226_389.815_865_9).abs() < 1e-3);
        let back = merc.reproject(&Crs::wgs84()).unwrap();
        assert!((back.min_x - env.min_x).abs() < 1e-9);
        assert!((back.max_y - env.max_y).abs() < 1e-9);
    }

    #[test]
    fn unknown_transform_fails() {
        let env = Envelope::new(0.0, 1.0, 0.0, 1.0, Crs::new("EPSG:27700"));
        assert!(env.reproject(&Crs::wgs84()).is_err());
        assert_eq!(env.reproject(&Crs::new("EPSG:27700")).unwrap(), env);
    }

    #[test]
    fn polygon_envelope() {
        let g = Geometry::rectangle(-2.0, 3.0, 1.0, 6.0);
        assert_eq!(
            g.envelope(&Crs::wgs84()).unwrap(),
            Envelope::new(-2.0, 1.0, 3.0, 6.0, Crs::wgs84())
        );
    }

    #[test]
    fn geometry_is_geojson_shaped() {
        let g: Geometry =
            serde_json::from_str(r#"{"type":"Point","coordinates":[1.5,2.0]}"#).unwrap();
        assert_eq!(g, Geometry::Point([1.5, 2.0]));
    }
}
