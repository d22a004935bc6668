//! PLY file writing

use crate::ply::PlyError;
use crate::types::PointCloud;
use byteorder::{LittleEndian, WriteBytesExt};
use glam::Vec3;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Body encoding of a written PLY file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlyEncoding {
    #[default]
    BinaryLittleEndian,
    Ascii,
}

impl PlyEncoding {
    fn header_name(self) -> &'static str {
        match self {
            PlyEncoding::BinaryLittleEndian => "binary_little_endian",
            PlyEncoding::Ascii => "ascii",
        }
    }
}

fn color_to_u8(color: Vec3) -> [u8; 3] {
    let c = (color.clamp(Vec3::ZERO, Vec3::ONE) * 255.0).round();
    [c.x as u8, c.y as u8, c.z as u8]
}

/// Serialize a cloud as PLY: positions always, normals and colors when every point has them.
pub fn write_ply<W: Write>(mut writer: W, cloud: &PointCloud, encoding: PlyEncoding) -> Result<(), PlyError> {
    let with_normals = cloud.has_normals();
    let with_colors = cloud.has_colors();

    writeln!(writer, "ply")?;
    writeln!(writer, "format {} 1.0", encoding.header_name())?;
    writeln!(writer, "comment depthcloud")?;
    writeln!(writer, "element vertex {}", cloud.len())?;
    for axis in ["x", "y", "z"] {
        writeln!(writer, "property float {axis}")?;
    }
    if with_normals {
        for axis in ["nx", "ny", "nz"] {
            writeln!(writer, "property float {axis}")?;
        }
    }
    if with_colors {
        for channel in ["red", "green", "blue"] {
            writeln!(writer, "property uchar {channel}")?;
        }
    }
    writeln!(writer, "end_header")?;

    for point in &cloud.points {
        let normal = point.normal.filter(|_| with_normals);
        let color = point.color.filter(|_| with_colors).map(color_to_u8);

        match encoding {
            PlyEncoding::BinaryLittleEndian => {
                for v in point.position.to_array() {
                    writer.write_f32::<LittleEndian>(v)?;
                }
                if let Some(n) = normal {
                    for v in n.to_array() {
                        writer.write_f32::<LittleEndian>(v)?;
                    }
                }
                if let Some(rgb) = color {
                    writer.write_all(&rgb)?;
                }
            }
            PlyEncoding::Ascii => {
                let p = point.position;
                write!(writer, "{} {} {}", p.x, p.y, p.z)?;
                if let Some(n) = normal {
                    write!(writer, " {} {} {}", n.x, n.y, n.z)?;
                }
                if let Some([r, g, b]) = color {
                    write!(writer, " {r} {g} {b}")?;
                }
                writeln!(writer)?;
            }
        }
    }

    writer.flush()?;
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "pointcloud.ply".to_string());
    path.with_file_name(format!(".{name}.tmp"))
}

/// Write a cloud to `path`, replacing any existing file.
///
/// The data goes to a temporary sibling first and is renamed into place, so a
/// failed write never leaves a truncated file at `path`.
#[tracing::instrument(skip_all, fields(path = %path.display(), points = cloud.len()))]
pub fn save_ply(path: &Path, cloud: &PointCloud, encoding: PlyEncoding) -> Result<(), PlyError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp = temp_path_for(path);
    let result = File::create(&tmp)
        .map_err(PlyError::from)
        .and_then(|file| write_ply(BufWriter::new(file), cloud, encoding));

    if let Err(err) = result {
        let _ = fs::remove_file(&tmp);
        return Err(err);
    }

    fs::rename(&tmp, path)?;
    debug!("Wrote {} points ({:?})", cloud.len(), encoding);
    info!("Saved point cloud to: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ply::load_ply;
    use crate::types::Point;

    fn sample_cloud() -> PointCloud {
        PointCloud::new(vec![
            Point::colored(Vec3::new(0.5, -1.0, -2.0), Vec3::new(1.0, 0.0, 0.0)).with_normal(Vec3::Z),
            Point::colored(Vec3::new(-0.25, 0.75, -1.5), Vec3::new(0.0, 0.5, 1.0)).with_normal(Vec3::Y),
        ])
    }

    #[test]
    fn test_header_lists_available_properties() {
        let mut out = Vec::new();
        write_ply(&mut out, &sample_cloud(), PlyEncoding::Ascii).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("ply\nformat ascii 1.0\n"));
        assert!(text.contains("element vertex 2\n"));
        assert!(text.contains("property float nx\n"));
        assert!(text.contains("property uchar red\n"));
        assert!(text.contains("end_header\n0.5 -1 -2 0 0 1 255 0 0\n"));
    }

    #[test]
    fn test_header_omits_partial_properties() {
        let cloud = PointCloud::new(vec![
            Point::colored(Vec3::ZERO, Vec3::ONE),
            Point::new(Vec3::X),
        ]);
        let mut out = Vec::new();
        write_ply(&mut out, &cloud, PlyEncoding::Ascii).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(!text.contains("red"));
        assert!(!text.contains("nx"));
        assert!(text.ends_with("end_header\n0 0 0\n1 0 0\n"));
    }

    #[test]
    fn test_binary_body_size() {
        let mut out = Vec::new();
        write_ply(&mut out, &sample_cloud(), PlyEncoding::BinaryLittleEndian).unwrap();
        let header_end = out
            .windows(b"end_header\n".len())
            .position(|w| w == b"end_header\n")
            .unwrap()
            + b"end_header\n".len();
        // 6 floats + 3 bytes per vertex
        assert_eq!(out.len() - header_end, 2 * (6 * 4 + 3));
    }

    #[test]
    fn test_save_then_load_binary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cloud.ply");
        let cloud = sample_cloud();

        save_ply(&path, &cloud, PlyEncoding::BinaryLittleEndian).unwrap();
        let loaded = load_ply(&path).unwrap();

        assert_eq!(loaded.len(), cloud.len());
        assert!(loaded.has_colors());
        assert!(loaded.has_normals());
        for (a, b) in loaded.points.iter().zip(cloud.points.iter()) {
            assert!((a.position - b.position).length() < 1e-6);
            assert!((a.normal.unwrap() - b.normal.unwrap()).length() < 1e-6);
            assert!((a.color.unwrap() - b.color.unwrap()).length() < 0.01);
        }
        assert!(!dir.path().join("nested").join(".cloud.ply.tmp").exists());
    }

    #[test]
    fn test_save_then_load_ascii() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cloud.ply");

        save_ply(&path, &sample_cloud(), PlyEncoding::Ascii).unwrap();
        let loaded = load_ply(&path).unwrap();

        assert_eq!(loaded.len(), 2);
        assert!((loaded.points[1].position - Vec3::new(-0.25, 0.75, -1.5)).length() < 1e-6);
    }

    #[test]
    fn test_save_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cloud.ply");
        std::fs::write(&path, b"stale").unwrap();

        save_ply(&path, &sample_cloud(), PlyEncoding::Ascii).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("ply\n"));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.ply");
        assert!(matches!(load_ply(&path), Err(PlyError::Io(_))));
        assert!(!path.exists());
    }
}
