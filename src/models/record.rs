use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Names of the derived fields every staged record carries.
pub mod fields {
    pub const UNIT_ID: &str = "UnitID";
    pub const GRANK_FIRE: &str = "GRANK_FIRE";
    pub const SOURCEFIRE: &str = "SOURCEFIRE";
    pub const SNAME_FIRE: &str = "SNAME_FIRE";
    pub const CNAME_FIRE: &str = "CNAME_FIRE";
    pub const BUFFT_FIRE: &str = "BUFFT_FIRE";
    pub const BUFFM_FIRE: &str = "BUFFM_FIRE";
    pub const CMNT_FIRE: &str = "CMNT_FIRE";
    pub const INST_FIRE: &str = "INST_FIRE";
    /// CNDDB only: PLANT vs ANIMAL, read by the San Bernardino filter.
    pub const SPECIES_TYPE: &str = "Type";

    /// Written by the ownership intersection, copied into [`UNIT_ID`].
    pub const UNIT_ID_FS: &str = "UnitID_FS";
    pub const FORESTNAME: &str = "FORESTNAME";
    /// Added by the engine's buffer operation.
    pub const BUFF_DIST: &str = "BUFF_DIST";
}

/// One US survey foot in meters; `BUFFM_FIRE` is always derived through
/// this so the two buffer fields never drift apart.
pub const FEET_TO_METERS: f64 = 0.3048;

pub fn feet_to_meters(feet: f64) -> f64 {
    feet * FEET_TO_METERS
}

pub type ObjectId = i64;

/// Axis-aligned bounding envelope, the only geometry detail this side of
/// the engine boundary ever sees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Envelope {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    pub fn point(x: f64, y: f64) -> Self {
        Self::new(x, y, x, y)
    }

    pub fn intersects(&self, other: &Envelope) -> bool {
        self.xmin <= other.xmax
            && other.xmin <= self.xmax
            && self.ymin <= other.ymax
            && other.ymin <= self.ymax
    }

    pub fn intersection(&self, other: &Envelope) -> Option<Envelope> {
        if !self.intersects(other) {
            return None;
        }
        Some(Envelope::new(
            self.xmin.max(other.xmin),
            self.ymin.max(other.ymin),
            self.xmax.min(other.xmax),
            self.ymax.min(other.ymax),
        ))
    }

    /// Grow the envelope outward by `distance` map units on every side.
    pub fn expand(&self, distance: f64) -> Envelope {
        Envelope::new(
            self.xmin - distance,
            self.ymin - distance,
            self.xmax + distance,
            self.ymax + distance,
        )
    }

    /// Swap inverted extents in place; returns true when a repair was made.
    pub fn normalize(&mut self) -> bool {
        let mut repaired = false;
        if self.xmin > self.xmax {
            std::mem::swap(&mut self.xmin, &mut self.xmax);
            repaired = true;
        }
        if self.ymin > self.ymax {
            std::mem::swap(&mut self.ymin, &mut self.ymax);
            repaired = true;
        }
        repaired
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryKind {
    Point,
    Polyline,
    Polygon,
}

/// Engine-owned geometry: one envelope per part, multipart when `parts`
/// holds more than one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub kind: GeometryKind,
    pub parts: Vec<Envelope>,
}

impl Geometry {
    pub fn new(kind: GeometryKind, parts: Vec<Envelope>) -> Self {
        Self { kind, parts }
    }

    pub fn point(x: f64, y: f64) -> Self {
        Self::new(GeometryKind::Point, vec![Envelope::point(x, y)])
    }

    pub fn is_multipart(&self) -> bool {
        self.parts.len() > 1
    }
}

/// Typed attribute value. Source tables mix text, counts and measures, so
/// records carry a map of these rather than a fixed struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Text(String),
    Int(i64),
    Float(f64),
    Null,
}

impl AttrValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            AttrValue::Float(f) => Some(*f),
            AttrValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null)
    }
}

/// One feature: object id, geometry, attributes. Created by the external
/// store; the rule engine mutates attributes in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub oid: ObjectId,
    pub geometry: Geometry,
    pub attributes: BTreeMap<String, AttrValue>,
}

impl FeatureRecord {
    pub fn new(oid: ObjectId, geometry: Geometry) -> Self {
        Self {
            oid,
            geometry,
            attributes: BTreeMap::new(),
        }
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        self.attributes.get(field).and_then(AttrValue::as_text)
    }

    /// Text value or "" for missing/null, matching how the source tables
    /// surface empty strings.
    pub fn text_or_empty(&self, field: &str) -> &str {
        self.text(field).unwrap_or("")
    }

    pub fn float(&self, field: &str) -> Option<f64> {
        self.attributes.get(field).and_then(AttrValue::as_float)
    }

    pub fn is_null(&self, field: &str) -> bool {
        self.attributes.get(field).map_or(true, AttrValue::is_null)
    }

    pub fn set_text(&mut self, field: &str, value: impl Into<String>) {
        self.attributes
            .insert(field.to_string(), AttrValue::Text(value.into()));
    }

    pub fn set_float(&mut self, field: &str, value: f64) {
        self.attributes
            .insert(field.to_string(), AttrValue::Float(value));
    }

    pub fn set_int(&mut self, field: &str, value: i64) {
        self.attributes
            .insert(field.to_string(), AttrValue::Int(value));
    }

    /// Write both buffer fields from a distance in feet.
    pub fn set_buffer_feet(&mut self, feet: f64) {
        self.set_float(fields::BUFFT_FIRE, feet);
        self.set_float(fields::BUFFM_FIRE, feet_to_meters(feet));
    }

    pub fn rank(&self) -> Option<&str> {
        self.text(fields::GRANK_FIRE)
    }

    pub fn unit_id(&self) -> Option<&str> {
        self.text(fields::UNIT_ID)
    }
}
