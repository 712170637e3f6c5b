//! Math and basic value types: vectors, quaternions, planes, colours, time,
//! angles, UUIDs and matrices

use super::{logged, summary_or_error, FormatContext, SyntheticProvider};
use crate::error::{FormatterError, Result};
use crate::types::{ScalarValue, Value};

/// Plain numeric text; byte-sized integers print as numbers, not characters
fn number_text(cx: &FormatContext<'_>, value: &Value) -> Result<String> {
    Ok(match value.scalar(cx.target)? {
        ScalarValue::Char(c) => c.to_string(),
        other => other.to_string(),
    })
}

/// Follow a dotted member path such as `m_vNormal.x`
fn member_path(cx: &FormatContext<'_>, value: &Value, path: &str) -> Result<Value> {
    path.split('.')
        .try_fold(value.clone(), |v, name| v.field(cx.target, name))
}

/// `{ label=value, ... }` over the given member paths
fn components(cx: &FormatContext<'_>, value: &Value, parts: &[(&str, &str)]) -> Result<String> {
    let rendered = parts
        .iter()
        .map(|(label, path)| {
            let member = member_path(cx, value, path)?;
            Ok(format!("{}={}", label, number_text(cx, &member)?))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(format!("{{ {} }}", rendered.join(", ")))
}

const XY: &[(&str, &str)] = &[("x", "x"), ("y", "y")];
const XYZ: &[(&str, &str)] = &[("x", "x"), ("y", "y"), ("z", "z")];
const XYZW: &[(&str, &str)] = &[("x", "x"), ("y", "y"), ("z", "z"), ("w", "w")];
const RGBA: &[(&str, &str)] = &[("r", "r"), ("g", "g"), ("b", "b"), ("a", "a")];
const PLANE: &[(&str, &str)] = &[
    ("nx", "m_vNormal.x"),
    ("ny", "m_vNormal.y"),
    ("nz", "m_vNormal.z"),
    ("negDist", "m_fNegDistance"),
];

pub fn vec2_summary(cx: &FormatContext<'_>, value: &Value) -> String {
    summary_or_error(components(cx, value, XY), "vec2_summary")
}

pub fn vec3_summary(cx: &FormatContext<'_>, value: &Value) -> String {
    summary_or_error(components(cx, value, XYZ), "vec3_summary")
}

/// Also used for quaternions
pub fn vec4_summary(cx: &FormatContext<'_>, value: &Value) -> String {
    summary_or_error(components(cx, value, XYZW), "vec4_summary")
}

pub fn plane_summary(cx: &FormatContext<'_>, value: &Value) -> String {
    summary_or_error(components(cx, value, PLANE), "plane_summary")
}

/// Float colours and byte colours share the layout
pub fn color_summary(cx: &FormatContext<'_>, value: &Value) -> String {
    summary_or_error(components(cx, value, RGBA), "color_summary")
}

pub fn time_summary(cx: &FormatContext<'_>, value: &Value) -> String {
    summary_or_error(
        components(cx, value, &[("seconds", "m_fTime")]),
        "time_summary",
    )
}

/// Radians shown as degrees with two decimals
pub fn angle_text(radians: f64) -> String {
    format!("{{ Degree={:.2}° }}", radians.to_degrees())
}

pub fn angle_summary(cx: &FormatContext<'_>, value: &Value) -> String {
    summary_or_error(
        value
            .field(cx.target, "m_fRadian")
            .and_then(|r| r.as_f64(cx.target))
            .map(angle_text),
        "angle_summary",
    )
}

/// Canonical 8-4-4-4-12 text of the two 64-bit halves. The time fields come
/// little-endian from the high half, clock sequence and node big-endian from the
/// low half.
pub fn uuid_text(high: u64, low: u64) -> String {
    let high = high.to_le_bytes();
    let low = low.to_le_bytes();
    let time_low = u32::from_le_bytes([high[0], high[1], high[2], high[3]]);
    let time_mid = u16::from_le_bytes([high[4], high[5]]);
    let time_hi = u16::from_le_bytes([high[6], high[7]]);
    let clock_seq = u16::from_be_bytes([low[0], low[1]]);
    let node = low[2..8]
        .iter()
        .fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
    format!(
        "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}",
        time_low, time_mid, time_hi, clock_seq, node
    )
}

pub fn uuid_summary(cx: &FormatContext<'_>, value: &Value) -> String {
    summary_or_error(
        super::read_field(cx, value, "m_uiHigh").and_then(|high| {
            let low = super::read_field(cx, value, "m_uiLow")?;
            Ok(uuid_text(high, low))
        }),
        "uuid_summary",
    )
}

// ==================== Matrices ====================

#[derive(Debug, Clone)]
struct MatrixSnapshot {
    elements: Value,
    base: u64,
    element_size: u64,
    element: crate::backend::TypeHandle,
}

/// Column-major matrix: `Column0..ColumnN-1` as vectors, then the raw elements
#[derive(Debug, Clone)]
pub struct MatrixProvider {
    dimension: u64,
    snapshot: Option<MatrixSnapshot>,
}

impl MatrixProvider {
    /// `dimension` is 3 for `nsMat3`, 4 for `nsMat4`
    pub fn new(dimension: u64) -> Self {
        Self {
            dimension,
            snapshot: None,
        }
    }

    fn column_type_name(&self) -> &'static str {
        if self.dimension == 3 {
            "nsVec3"
        } else {
            "nsVec4"
        }
    }

    fn snapshot(cx: &FormatContext<'_>, value: &Value) -> Result<MatrixSnapshot> {
        let elements = value.field(cx.target, "m_fElementsCM")?;
        let element = value
            .type_handle()
            .and_then(|t| t.underlying().template_argument(0))
            .or_else(|| elements.type_handle().and_then(|t| t.element_type()))
            .ok_or_else(|| {
                FormatterError::TypeMismatch(format!("{} has no element type", value.type_name()))
            })?;
        Ok(MatrixSnapshot {
            base: elements.base_address(cx.target)?,
            element_size: super::view::element_size(&element)?,
            elements,
            element,
        })
    }
}

impl SyntheticProvider for MatrixProvider {
    fn update(&mut self, cx: &FormatContext<'_>, value: &Value) {
        self.snapshot = logged(Self::snapshot(cx, value), "MatrixProvider::update");
    }

    fn num_children(&self) -> usize {
        self.dimension as usize + 1
    }

    fn child_at_index(&mut self, cx: &FormatContext<'_>, index: usize) -> Option<Value> {
        let s = self.snapshot.as_ref()?;
        let column = index as u64;
        if column == self.dimension {
            return Some(s.elements.clone());
        }
        if column > self.dimension {
            return None;
        }
        let label = format!("Column{}", column);
        let address = s.base + s.element_size * self.dimension * column;
        Some(match cx.target.find_type(self.column_type_name()) {
            Some(vec) => Value::at(label, address, vec),
            None => Value::array_at(label, address, s.element.clone(), self.dimension),
        })
    }
}
