//! Depth-to-color alignment.

use crate::intrinsics::{Extrinsics, Intrinsics};
use crate::source::DepthImage;
use image::Luma;

/// Re-project a raw depth image into the color camera's pixel grid.
///
/// Each valid depth pixel covers a square footprint. Its two opposite corners
/// are de-projected with the depth intrinsics at the pixel's depth, moved into
/// the color frame with `extrinsics`, and projected with the color intrinsics.
/// Every color pixel whose center falls inside the projected rectangle gets
/// that depth, so a color grid that magnifies the depth image is still fully
/// covered. A footprint smaller than one color pixel fills the pixel nearest
/// its center. Where footprints overlap the nearest depth wins. Pixels no
/// footprint reaches stay at 0.
///
/// `depth_scale` converts raw units to meters, since extrinsic translations
/// are metric.
pub fn align_depth_to_color(
    depth: &DepthImage,
    depth_intrinsics: &Intrinsics,
    color_intrinsics: &Intrinsics,
    extrinsics: &Extrinsics,
    depth_scale: f32,
) -> DepthImage {
    if extrinsics.is_identity()
        && depth_intrinsics == color_intrinsics
        && depth.dimensions() == color_intrinsics.dimensions()
    {
        return depth.clone();
    }

    let (out_w, out_h) = color_intrinsics.dimensions();
    let mut out = DepthImage::new(out_w, out_h);
    let to_color = |u: f32, v: f32, z: f32| {
        let p = extrinsics.transform_point(depth_intrinsics.deproject(u, v, z));
        (p.z > 0.0).then(|| (color_intrinsics.project(p), p.z))
    };

    for (u, v, pixel) in depth.enumerate_pixels() {
        let raw = pixel.0[0];
        if raw == 0 {
            continue;
        }

        let (u, v) = (u as f32, v as f32);
        let z = raw as f32 * depth_scale;
        let (Some((center, z_color)), Some((c0, _)), Some((c1, _))) = (
            to_color(u, v, z),
            to_color(u - 0.5, v - 0.5, z),
            to_color(u + 0.5, v + 0.5, z),
        ) else {
            continue;
        };

        let Some((x0, x1)) = footprint_span(c0.x, c1.x, center.x, out_w) else {
            continue;
        };
        let Some((y0, y1)) = footprint_span(c0.y, c1.y, center.y, out_h) else {
            continue;
        };

        let aligned = (z_color / depth_scale).round().clamp(1.0, u16::MAX as f32) as u16;
        for y in y0..=y1 {
            for x in x0..=x1 {
                let target = out.get_pixel_mut(x, y);
                if target.0[0] == 0 || aligned < target.0[0] {
                    *target = Luma([aligned]);
                }
            }
        }
    }

    out
}

/// Color pixels along one axis whose centers lie within `[a, b]`, clamped to
/// `0..len`. Falls back to the pixel nearest `center` when the span holds no
/// pixel center.
fn footprint_span(a: f32, b: f32, center: f32, len: u32) -> Option<(u32, u32)> {
    let (lo, hi) = (a.min(b).ceil(), a.max(b).floor());
    let (lo, hi) = if lo > hi {
        let nearest = center.round();
        (nearest, nearest)
    } else {
        (lo, hi)
    };

    let last = len as f32 - 1.0;
    if hi < 0.0 || lo > last {
        return None;
    }
    Some((lo.max(0.0) as u32, hi.min(last) as u32))
}
