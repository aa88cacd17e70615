//! Blacklisted delivery areas.
//!
//! This module stores named polygonal regions, answers point-in-polygon
//! queries with a ray-casting test, and persists the whole collection
//! through a pluggable store as `;`-separated `id|name|lat:lon,...`
//! records. The record format is the compatibility surface of previously
//! stored data and must not change shape.

use std::path::PathBuf;
use tracing::{debug, warn};

/// A latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// A named polygonal blacklist region.
#[derive(Debug, Clone, PartialEq)]
pub struct GeofenceArea {
    /// Caller-assigned unique id
    pub id: u64,
    /// Display name; also matched against offer destination text
    pub name: String,
    /// Ordered vertex ring. Rings with fewer than 3 vertices are stored
    /// but never contain any point.
    pub points: Vec<GeoPoint>,
}

impl GeofenceArea {
    pub fn new(id: u64, name: impl Into<String>, points: Vec<GeoPoint>) -> Self {
        Self {
            id,
            name: name.into(),
            points,
        }
    }

    /// Ray-casting parity test: count crossings of a horizontal ray from
    /// the point against each polygon edge.
    pub fn contains_point(&self, point: GeoPoint) -> bool {
        let ring = &self.points;
        if ring.len() < 3 {
            return false;
        }

        let mut inside = false;
        let mut j = ring.len() - 1;

        for i in 0..ring.len() {
            let (xi, yi) = (ring[i].lon, ring[i].lat);
            let (xj, yj) = (ring[j].lon, ring[j].lat);

            if ((yi > point.lat) != (yj > point.lat))
                && (point.lon < (xj - xi) * (point.lat - yi) / (yj - yi) + xi)
            {
                inside = !inside;
            }
            j = i;
        }

        inside
    }

    fn to_record(&self) -> String {
        let points = self
            .points
            .iter()
            .map(|p| format!("{}:{}", p.lat, p.lon))
            .collect::<Vec<_>>()
            .join(",");
        format!("{}|{}|{}", self.id, self.name, points)
    }

    fn from_record(record: &str) -> Option<Self> {
        let parts: Vec<&str> = record.split('|').collect();
        if parts.len() != 3 {
            return None;
        }

        let id = parts[0].parse::<u64>().ok()?;
        let name = parts[1].to_string();

        let points = if parts[2].is_empty() {
            Vec::new()
        } else {
            let mut points = Vec::new();
            for pair in parts[2].split(',') {
                let (lat, lon) = pair.split_once(':')?;
                points.push(GeoPoint::new(lat.parse().ok()?, lon.parse().ok()?));
            }
            points
        };

        Some(Self { id, name, points })
    }
}

/// Serialize a collection of areas into the persisted record string.
///
/// Names must not contain the `|`, `;`, `,` or `:` delimiters; such names
/// would corrupt neighboring fields on the way back in.
pub fn serialize_areas(areas: &[GeofenceArea]) -> String {
    areas
        .iter()
        .map(GeofenceArea::to_record)
        .collect::<Vec<_>>()
        .join(";")
}

/// Parse a persisted record string back into areas.
///
/// Malformed records are skipped with a warning; one bad record never
/// aborts the whole load.
pub fn parse_areas(blob: &str) -> Vec<GeofenceArea> {
    if blob.is_empty() {
        return Vec::new();
    }

    blob.split(';')
        .filter_map(|record| {
            let area = GeofenceArea::from_record(record);
            if area.is_none() {
                warn!("Skipping malformed blacklist record: {:?}", record);
            }
            area
        })
        .collect()
}

/// Backing store for the serialized area collection.
///
/// Persistence itself (file, preferences, database) belongs to the
/// embedding host; the index only hands over the full serialized blob.
pub trait AreaStore: Send + Sync {
    fn load(&self) -> std::io::Result<String>;
    fn persist(&self, blob: &str) -> std::io::Result<()>;
}

/// File-backed store writing the blob under the user config directory.
pub struct FileAreaStore {
    path: PathBuf,
}

impl FileAreaStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Get the default blacklist file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("offer-autopilot")
            .join("blacklist.txt")
    }
}

impl AreaStore for FileAreaStore {
    fn load(&self) -> std::io::Result<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e),
        }
    }

    fn persist(&self, blob: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, blob)
    }
}

/// In-memory ordered collection of blacklist areas.
///
/// Loaded once at construction and kept for the process lifetime; every
/// mutation re-serializes the whole collection to the store.
pub struct GeofenceIndex {
    areas: Vec<GeofenceArea>,
    store: Box<dyn AreaStore>,
}

impl GeofenceIndex {
    /// Load the persisted areas from the store.
    ///
    /// A store read failure yields an empty index; the decision path must
    /// keep working without a blacklist.
    pub fn load(store: Box<dyn AreaStore>) -> Self {
        let areas = match store.load() {
            Ok(blob) => parse_areas(&blob),
            Err(e) => {
                warn!("Failed to load blacklist areas: {}, starting empty", e);
                Vec::new()
            }
        };

        debug!("Loaded {} blacklist areas", areas.len());
        Self { areas, store }
    }

    /// Add an area and re-serialize the collection.
    pub fn add(&mut self, area: GeofenceArea) -> std::io::Result<()> {
        debug!("Adding blacklist area {} ({:?})", area.id, area.name);
        self.areas.push(area);
        self.store.persist(&serialize_areas(&self.areas))
    }

    /// Remove an area by id and re-serialize the collection.
    /// Removing an absent id is a no-op.
    pub fn remove(&mut self, id: u64) -> std::io::Result<()> {
        let before = self.areas.len();
        self.areas.retain(|a| a.id != id);

        if self.areas.len() == before {
            return Ok(());
        }

        debug!("Removed blacklist area {}", id);
        self.store.persist(&serialize_areas(&self.areas))
    }

    /// Remove every area and re-serialize.
    pub fn clear(&mut self) -> std::io::Result<()> {
        self.areas.clear();
        self.store.persist(&serialize_areas(&self.areas))
    }

    /// Whether a destination text names any blacklisted area.
    ///
    /// True geofencing would need the address geocoded first; until the
    /// host supplies coordinates, a case-insensitive name match stands in.
    pub fn is_address_blacklisted(&self, address: &str) -> bool {
        let address = address.to_lowercase();
        self.areas
            .iter()
            .any(|area| address.contains(&area.name.to_lowercase()))
    }

    /// Whether any stored area contains the given coordinates.
    pub fn covers(&self, point: GeoPoint) -> bool {
        self.areas.iter().any(|area| area.contains_point(point))
    }

    /// All stored areas, in insertion order.
    pub fn areas(&self) -> &[GeofenceArea] {
        &self.areas
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }
}
