//! PLY file loading

use crate::ply::PlyError;
use crate::types::{Point, PointCloud};
use glam::Vec3;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info, warn};

// Only the vertex element matters; faces and other elements are ignored.
#[derive(Deserialize, Debug)]
struct PlyFile {
    #[serde(default, rename = "vertex")]
    vertex: Vec<HashMap<String, JsonValue>>,
}

fn get_f32(prop: Option<&JsonValue>) -> Option<f32> {
    prop.and_then(|v| match v {
        JsonValue::Number(n) => n.as_f64().map(|f| f as f32),
        _ => None,
    })
}

fn get_u8(prop: Option<&JsonValue>) -> Option<u8> {
    prop.and_then(|v| match v {
        JsonValue::Number(n) => n
            .as_u64()
            .map(|u| u.min(255) as u8)
            .or_else(|| n.as_f64().map(|f| f.clamp(0.0, 255.0) as u8)),
        _ => None,
    })
}

fn read_color(vertex: &HashMap<String, JsonValue>) -> Option<Vec3> {
    let rgb = |r: u8, g: u8, b: u8| Vec3::new(r as f32, g as f32, b as f32) / 255.0;
    if let (Some(r), Some(g), Some(b)) = (
        get_u8(vertex.get("red")),
        get_u8(vertex.get("green")),
        get_u8(vertex.get("blue")),
    ) {
        Some(rgb(r, g, b))
    } else if let (Some(r), Some(g), Some(b)) = (
        get_u8(vertex.get("r")),
        get_u8(vertex.get("g")),
        get_u8(vertex.get("b")),
    ) {
        Some(rgb(r, g, b))
    } else {
        None
    }
}

fn read_normal(vertex: &HashMap<String, JsonValue>) -> Option<Vec3> {
    match (
        get_f32(vertex.get("nx")),
        get_f32(vertex.get("ny")),
        get_f32(vertex.get("nz")),
    ) {
        (Some(x), Some(y), Some(z)) => Some(Vec3::new(x, y, z)),
        _ => None,
    }
}

/// Load a point cloud from a PLY file (ASCII or binary).
///
/// Positions are required; `red/green/blue` (or `r/g/b`) colors and
/// `nx/ny/nz` normals are picked up when present.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn load_ply(path: &Path) -> Result<PointCloud, PlyError> {
    debug!("Loading PLY vertices from: {}", path.display());
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let ply_data: PlyFile = serde_ply::from_reader(reader).map_err(|e| {
        warn!("Failed to parse PLY file: {}", e);
        PlyError::Parse(e.to_string())
    })?;

    let mut points = Vec::with_capacity(ply_data.vertex.len());

    for (index, vertex) in ply_data.vertex.iter().enumerate() {
        let coord = |property: &'static str| {
            get_f32(vertex.get(property)).ok_or(PlyError::MissingProperty { property, index })
        };
        let position = Vec3::new(coord("x")?, coord("y")?, coord("z")?);

        points.push(Point {
            position,
            color: read_color(vertex),
            normal: read_normal(vertex),
        });
    }

    let cloud = PointCloud::new(points);
    info!(
        "PLY file parsed: {} points (colors: {}, normals: {})",
        cloud.len(),
        cloud.has_colors(),
        cloud.has_normals()
    );
    Ok(cloud)
}
