//! Surface normal estimation.
//!
//! Each normal is the eigenvector of the smallest eigenvalue of the covariance
//! of the point's k nearest neighbours (the point included). Neighbours are
//! found through a uniform hash grid sized from the cloud's extent.

use depthcloud_data::PointCloud;
use glam::{IVec3, Vec3};
use nalgebra::{Matrix3, SymmetricEigen, Vector3};
use std::collections::HashMap;
use tracing::debug;

/// Parameters of the k-nearest-neighbour normal estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalEstimation {
    /// Neighbourhood size.
    pub knn: usize,
    /// Normals are flipped to face this point (the sensor origin by default).
    pub viewpoint: Vec3,
}

impl Default for NormalEstimation {
    fn default() -> Self {
        Self {
            knn: 30,
            viewpoint: Vec3::ZERO,
        }
    }
}

impl NormalEstimation {
    pub fn with_knn(knn: usize) -> Self {
        Self {
            knn,
            ..Self::default()
        }
    }

    /// Overwrite the normal of every point in `cloud`.
    pub fn estimate(&self, cloud: &mut PointCloud) {
        if cloud.is_empty() {
            return;
        }

        let k = self.knn.max(1);
        let positions: Vec<Vec3> = cloud.positions().collect();
        let grid = HashGrid::build(&positions, k);
        let mut neighbours = Vec::with_capacity(k * 4);

        for (i, point) in cloud.points.iter_mut().enumerate() {
            grid.knn(&positions, positions[i], k, &mut neighbours);
            let normal = fit_normal(&positions, &neighbours);
            let to_view = self.viewpoint - point.position;
            point.normal = Some(if normal.dot(to_view) < 0.0 { -normal } else { normal });
        }

        debug!(
            "Estimated {} normals (k={}, cell={:.5})",
            positions.len(),
            k,
            grid.cell
        );
    }
}

/// Smallest-variance direction of the neighbourhood; +Z when it is degenerate.
fn fit_normal(positions: &[Vec3], neighbours: &[(f32, usize)]) -> Vec3 {
    if neighbours.len() < 3 {
        return Vec3::Z;
    }

    let n = neighbours.len() as f32;
    let mean = neighbours.iter().map(|&(_, i)| positions[i]).sum::<Vec3>() / n;

    let mut cov = Matrix3::<f32>::zeros();
    for &(_, i) in neighbours {
        let d = positions[i] - mean;
        let d = Vector3::new(d.x, d.y, d.z);
        cov += d * d.transpose();
    }
    cov /= n;

    let eigen = SymmetricEigen::new(cov);
    let smallest = eigen.eigenvalues.imin();
    let v = eigen.eigenvectors.column(smallest);
    let normal = Vec3::new(v[0], v[1], v[2]).normalize_or_zero();
    if normal == Vec3::ZERO { Vec3::Z } else { normal }
}

struct HashGrid {
    cell: f32,
    origin: Vec3,
    max_ring: i32,
    cells: HashMap<IVec3, Vec<usize>>,
}

impl HashGrid {
    /// Cells are sized so that a surface sampled like the cloud puts about
    /// `knn` points in each one.
    fn build(positions: &[Vec3], knn: usize) -> Self {
        let mut min = Vec3::splat(f32::MAX);
        let mut max = Vec3::splat(f32::MIN);
        for p in positions {
            min = min.min(*p);
            max = max.max(*p);
        }

        let extent = max - min;
        let mut sides = extent.to_array();
        sides.sort_by(|a, b| b.total_cmp(a));
        let n = positions.len() as f32;
        let k = knn as f32;

        let cell = if sides[1] > f32::EPSILON {
            (sides[0] * sides[1] / n * k).sqrt()
        } else if sides[0] > f32::EPSILON {
            sides[0] / n * k
        } else {
            1.0
        };
        let cell = cell.max(1e-6);

        let mut cells: HashMap<IVec3, Vec<usize>> = HashMap::new();
        for (i, p) in positions.iter().enumerate() {
            cells.entry(Self::key(*p, min, cell)).or_default().push(i);
        }

        let max_ring = (extent.max_element() / cell).ceil() as i32 + 1;
        Self {
            cell,
            origin: min,
            max_ring,
            cells,
        }
    }

    fn key(p: Vec3, origin: Vec3, cell: f32) -> IVec3 {
        ((p - origin) / cell).floor().as_ivec3()
    }

    /// Fill `out` with the `k` nearest points to `query` as `(distance², index)`.
    fn knn(&self, positions: &[Vec3], query: Vec3, k: usize, out: &mut Vec<(f32, usize)>) {
        out.clear();
        let center = Self::key(query, self.origin, self.cell);

        for ring in 0..=self.max_ring {
            for dz in -ring..=ring {
                for dy in -ring..=ring {
                    for dx in -ring..=ring {
                        if dx.abs().max(dy.abs()).max(dz.abs()) != ring {
                            continue;
                        }
                        if let Some(bucket) = self.cells.get(&(center + IVec3::new(dx, dy, dz))) {
                            out.extend(bucket.iter().map(|&i| (positions[i].distance_squared(query), i)));
                        }
                    }
                }
            }

            if out.len() >= k {
                out.select_nth_unstable_by(k - 1, |a, b| a.0.total_cmp(&b.0));
                out.truncate(k);
                // Anything in an unvisited ring is at least `ring * cell` away.
                let reach = ring as f32 * self.cell;
                let kth = out.iter().map(|n| n.0).fold(0.0, f32::max);
                if kth <= reach * reach {
                    return;
                }
            }
        }
    }
}
