//! Reload a saved point cloud and look at it in the terminal.

use crate::camera::{Camera, Projection};
use crate::config::ProjectLayout;
use crate::errors::ViewerError;
use crate::terminal::TerminalScreen;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use depthcloud_data::{PointCloud, load_ply};
use glam::{Vec2, Vec3};
use image::{Rgb, RgbImage};
use std::fmt::Write as _;
use std::time::Duration;
use tracing::info;

const FOV: f32 = std::f32::consts::FRAC_PI_3;
const ORBIT_STEP: f32 = 0.1;
const ZOOM_STEP: f32 = 0.85;
const VIEW_HELP: &str = "arrows/WASD orbit | +/- zoom | r reset | q/Esc quit";

/// Load `<processed_dir>/<filename>`. A missing file is reported, never created.
pub fn load(layout: &ProjectLayout, filename: &str) -> Result<PointCloud, ViewerError> {
    let path = layout.cloud_path(filename);
    if !path.is_file() {
        return Err(ViewerError::NotFound(path));
    }
    let cloud = load_ply(&path)?;
    info!("Loaded {} points from {}", cloud.len(), path.display());
    Ok(cloud)
}

/// A viewer key binding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewerAction {
    Orbit(Vec2),
    Zoom(f32),
    Reset,
    Quit,
}

pub fn action_for_key(key: KeyEvent) -> Option<ViewerAction> {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(ViewerAction::Quit);
    }
    let action = match key.code {
        KeyCode::Left | KeyCode::Char('a') => ViewerAction::Orbit(Vec2::new(-ORBIT_STEP, 0.0)),
        KeyCode::Right | KeyCode::Char('d') => ViewerAction::Orbit(Vec2::new(ORBIT_STEP, 0.0)),
        KeyCode::Up | KeyCode::Char('w') => ViewerAction::Orbit(Vec2::new(0.0, -ORBIT_STEP)),
        KeyCode::Down | KeyCode::Char('s') => ViewerAction::Orbit(Vec2::new(0.0, ORBIT_STEP)),
        KeyCode::Char('+') | KeyCode::Char('=') => ViewerAction::Zoom(ZOOM_STEP),
        KeyCode::Char('-') | KeyCode::Char('_') => ViewerAction::Zoom(1.0 / ZOOM_STEP),
        KeyCode::Char('r') => ViewerAction::Reset,
        KeyCode::Char('q') | KeyCode::Esc => ViewerAction::Quit,
        _ => return None,
    };
    Some(action)
}

/// Interactive orbit view. Blocks until the user quits.
pub fn view(cloud: &PointCloud) -> Result<(), ViewerError> {
    let mut camera = Camera::framing(&cloud.bounds(), FOV);
    let mut screen = TerminalScreen::open()?;
    let status = format!("{} points | {}", cloud.len(), VIEW_HELP);

    let mut dirty = true;
    loop {
        if dirty {
            let (width, height) = screen.canvas_size()?;
            let image = render(cloud, &camera, width, height);
            screen.draw(Some(&image), &status)?;
            dirty = false;
        }

        let Some(key) = screen.next_key(Duration::from_millis(250))? else {
            // redraw periodically so a resized terminal catches up
            dirty = true;
            continue;
        };
        match action_for_key(key) {
            Some(ViewerAction::Orbit(delta)) => camera.pose_mut().orbit(delta),
            Some(ViewerAction::Zoom(factor)) => camera.pose_mut().zoom(factor),
            Some(ViewerAction::Reset) => camera.reset(),
            Some(ViewerAction::Quit) => break,
            None => continue,
        }
        dirty = true;
    }

    screen.restore();
    Ok(())
}

/// Rasterize `cloud` as one pixel per point with a depth test.
///
/// Points without a color are drawn light gray.
pub fn render(cloud: &PointCloud, camera: &Camera, width: u32, height: u32) -> RgbImage {
    let mut image = RgbImage::new(width, height);
    if width == 0 || height == 0 || cloud.is_empty() {
        return image;
    }

    let pose = camera.pose();
    let radius = cloud.bounds().radius;
    let near = (pose.distance() - radius * 2.0).max(pose.distance() * 1e-3).max(1e-4);
    let far = pose.distance() + radius * 2.0 + near;
    let view_proj = Projection::new(width, height, FOV, near, far).matrix() * camera.view_matrix();

    let mut depth = vec![f32::INFINITY; (width * height) as usize];
    for point in &cloud.points {
        let clip = view_proj * point.position.extend(1.0);
        if clip.w <= 0.0 {
            continue;
        }
        let ndc = clip.truncate() / clip.w;
        if !(0.0..=1.0).contains(&ndc.z) || ndc.x.abs() > 1.0 || ndc.y.abs() > 1.0 {
            continue;
        }

        let x = (((ndc.x + 1.0) * 0.5 * width as f32) as u32).min(width - 1);
        let y = (((1.0 - ndc.y) * 0.5 * height as f32) as u32).min(height - 1);
        let idx = (y * width + x) as usize;
        if ndc.z < depth[idx] {
            depth[idx] = ndc.z;
            image.put_pixel(x, y, to_rgb(point.color.unwrap_or(Vec3::splat(0.85))));
        }
    }

    image
}

fn to_rgb(color: Vec3) -> Rgb<u8> {
    let c = (color.clamp(Vec3::ZERO, Vec3::ONE) * 255.0).round();
    Rgb([c.x as u8, c.y as u8, c.z as u8])
}

/// One-paragraph description used by `--no-window`.
pub fn summary(cloud: &PointCloud) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "points:  {}", cloud.len());
    if !cloud.is_empty() {
        let bounds = cloud.bounds();
        let _ = writeln!(
            out,
            "bounds:  [{:.3}, {:.3}, {:.3}] .. [{:.3}, {:.3}, {:.3}]",
            bounds.min.x, bounds.min.y, bounds.min.z, bounds.max.x, bounds.max.y, bounds.max.z
        );
    }
    let _ = writeln!(out, "colors:  {}", if cloud.has_colors() { "yes" } else { "no" });
    let _ = write!(out, "normals: {}", if cloud.has_normals() { "yes" } else { "no" });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use depthcloud_data::{PlyEncoding, Point, save_ply};

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ProjectLayout::new(dir.path());

        match load(&layout, "o3d.ply") {
            Err(ViewerError::NotFound(path)) => assert_eq!(path, layout.cloud_path("o3d.ply")),
            other => panic!("unexpected {other:?}"),
        }
        assert!(!layout.cloud_path("o3d.ply").exists());
        assert!(!layout.processed_dir().exists());
    }

    #[test]
    fn test_load_saved_cloud() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ProjectLayout::new(dir.path());
        let cloud = PointCloud::new(vec![
            Point::colored(Vec3::new(0.0, 0.0, -1.0), Vec3::X),
            Point::colored(Vec3::new(0.1, 0.0, -1.0), Vec3::Y),
        ]);
        save_ply(&layout.cloud_path("scan.ply"), &cloud, PlyEncoding::default()).unwrap();

        let loaded = load(&layout, "scan.ply").unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(loaded.has_colors());
    }

    #[test]
    fn test_render_centers_and_depth_tests() {
        let cloud = PointCloud::new(vec![
            Point::colored(Vec3::new(0.0, 0.0, -1.0), Vec3::new(1.0, 0.0, 0.0)),
            // behind the red point on the same ray
            Point::colored(Vec3::new(0.0, 0.0, -2.0), Vec3::new(0.0, 0.0, 1.0)),
            Point::colored(Vec3::new(0.5, 0.5, -1.5), Vec3::new(0.0, 1.0, 0.0)),
        ]);
        let camera = Camera::new(Vec3::new(0.0, 0.0, 2.0), Vec3::new(0.0, 0.0, -1.0));
        let image = render(&cloud, &camera, 41, 41);

        assert_eq!(image.get_pixel(20, 20), &Rgb([255, 0, 0]));
        let green = image.pixels().filter(|p| **p == Rgb([0, 255, 0])).count();
        assert_eq!(green, 1);
        assert!(image.pixels().all(|p| *p != Rgb([0, 0, 255])));
    }

    #[test]
    fn test_render_orbit_changes_view() {
        let cloud = PointCloud::new(
            (0..50)
                .map(|i| Point::new(Vec3::new(i as f32 * 0.02 - 0.5, 0.0, -1.0)))
                .collect(),
        );
        let mut camera = Camera::framing(&cloud.bounds(), FOV);
        let front = render(&cloud, &camera, 60, 40);
        camera.pose_mut().orbit(Vec2::new(1.2, 0.0));
        let side = render(&cloud, &camera, 60, 40);

        let lit = |img: &RgbImage| img.pixels().filter(|p| p.0 != [0, 0, 0]).count();
        assert!(lit(&front) > lit(&side));
        assert_eq!(front.get_pixel(0, 0), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_render_degenerate() {
        let camera = Camera::new(Vec3::Z, Vec3::ZERO);
        assert_eq!(render(&PointCloud::default(), &camera, 10, 10).dimensions(), (10, 10));
        let one = PointCloud::new(vec![Point::new(Vec3::ZERO)]);
        assert_eq!(render(&one, &camera, 0, 0).dimensions(), (0, 0));
    }

    #[test]
    fn test_key_bindings() {
        let key = |code| KeyEvent::new(code, KeyModifiers::NONE);
        assert_eq!(action_for_key(key(KeyCode::Char('q'))), Some(ViewerAction::Quit));
        assert_eq!(action_for_key(key(KeyCode::Esc)), Some(ViewerAction::Quit));
        assert_eq!(action_for_key(key(KeyCode::Char('r'))), Some(ViewerAction::Reset));
        assert_eq!(action_for_key(key(KeyCode::Char('+'))), Some(ViewerAction::Zoom(ZOOM_STEP)));
        assert!(matches!(action_for_key(key(KeyCode::Left)), Some(ViewerAction::Orbit(_))));
        assert_eq!(action_for_key(key(KeyCode::Char('a'))), action_for_key(key(KeyCode::Left)));
        assert_eq!(action_for_key(key(KeyCode::Char('x'))), None);
    }

    #[test]
    fn test_summary() {
        let cloud = PointCloud::new(vec![Point::new(Vec3::ZERO), Point::new(Vec3::ONE)]);
        let text = summary(&cloud);
        assert!(text.contains("points:  2"));
        assert!(text.contains("colors:  no"));
        assert!(text.contains("[1.000, 1.000, 1.000]"));
    }
}
