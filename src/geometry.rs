//! Procedural triangle meshes, Y-up and centered on the origin.
//!
//! Flat shapes (circle, ring, plane) lie in the XY plane facing +Z. Everything
//! is wound counter-clockwise when seen from outside.

use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, PI, TAU};
use three_d::*;


#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Sphere {
        radius: f32,
        width_segments: usize,
        height_segments: usize,
    },
    /// Cylinder of `length` with hemispherical caps of `radius`.
    Capsule {
        radius: f32,
        length: f32,
        cap_segments: usize,
        radial_segments: usize,
    },
    Cylinder {
        radius_top: f32,
        radius_bottom: f32,
        height: f32,
        radial_segments: usize,
    },
    Cone {
        radius: f32,
        height: f32,
        radial_segments: usize,
    },
    Box {
        width: f32,
        height: f32,
        depth: f32,
    },
    Torus {
        radius: f32,
        tube: f32,
        radial_segments: usize,
        tubular_segments: usize,
    },
    Ring {
        inner_radius: f32,
        outer_radius: f32,
        segments: usize,
        theta_start: f32,
        theta_length: f32,
    },
    Circle {
        radius: f32,
        segments: usize,
    },
    Plane {
        width: f32,
        height: f32,
    },
}

impl Shape {
    pub fn build(&self) -> MeshData {
        match *self {
            Shape::Sphere {
                radius,
                width_segments,
                height_segments,
            } => sphere(radius, width_segments, height_segments),
            Shape::Capsule {
                radius,
                length,
                cap_segments,
                radial_segments,
            } => capsule(radius, length, cap_segments, radial_segments),
            Shape::Cylinder {
                radius_top,
                radius_bottom,
                height,
                radial_segments,
            } => cylinder(radius_top, radius_bottom, height, radial_segments),
            Shape::Cone {
                radius,
                height,
                radial_segments,
            } => cylinder(0.0, radius, height, radial_segments),
            Shape::Box {
                width,
                height,
                depth,
            } => cuboid(width, height, depth),
            Shape::Torus {
                radius,
                tube,
                radial_segments,
                tubular_segments,
            } => torus(radius, tube, radial_segments, tubular_segments),
            Shape::Ring {
                inner_radius,
                outer_radius,
                segments,
                theta_start,
                theta_length,
            } => ring(inner_radius, outer_radius, segments, theta_start, theta_length),
            Shape::Circle { radius, segments } => {
                ring(0.0, radius, segments, 0.0, TAU)
            }
            Shape::Plane { width, height } => plane(width, height),
        }
    }
}


/// Flat vertex and index buffers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<f32>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn vertex(&self, i: usize) -> [f32; 3] {
        [
            self.positions[i * 3],
            self.positions[i * 3 + 1],
            self.positions[i * 3 + 2],
        ]
    }

    /// Axis-aligned bounds as `(min, max)`.
    pub fn bounds(&self) -> ([f32; 3], [f32; 3]) {
        let mut min = [f32::MAX; 3];
        let mut max = [f32::MIN; 3];
        for p in self.positions.chunks_exact(3) {
            for k in 0..3 {
                min[k] = min[k].min(p[k]);
                max[k] = max[k].max(p[k]);
            }
        }
        (min, max)
    }

    pub fn to_cpu_mesh(&self) -> CpuMesh {
        let positions = self
            .positions
            .chunks_exact(3)
            .map(|p| vec3(p[0], p[1], p[2]))
            .collect::<Vec<_>>();
        let mut mesh = CpuMesh {
            positions: Positions::F32(positions),
            indices: Indices::U32(self.indices.clone()),
            ..Default::default()
        };
        mesh.compute_normals();
        mesh
    }

    fn push(&mut self, p: [f32; 3]) -> u32 {
        let index = self.vertex_count() as u32;
        self.positions.extend_from_slice(&p);
        index
    }
}


/// `(rows + 1) * (cols + 1)` vertices from `f(row, col)`, two triangles per cell.
/// Faces point along `d(col) x d(row)`.
fn grid(rows: usize, cols: usize, f: impl Fn(usize, usize) -> [f32; 3]) -> MeshData {
    let mut mesh = MeshData {
        positions: Vec::with_capacity((rows + 1) * (cols + 1) * 3),
        indices: Vec::with_capacity(rows * cols * 6),
    };

    for row in 0..=rows {
        for col in 0..=cols {
            mesh.positions.extend_from_slice(&f(row, col));
        }
    }

    for row in 0..rows {
        for col in 0..cols {
            let first = (row * (cols + 1) + col) as u32;
            let second = first + 1;
            let third = ((row + 1) * (cols + 1) + col) as u32;
            let fourth = third + 1;

            mesh.indices.extend_from_slice(&[first, second, third]);
            mesh.indices.extend_from_slice(&[second, fourth, third]);
        }
    }

    mesh
}


/// Surface of revolution around Y. `profile` is `(radius, y)` from top to bottom.
fn lathe(profile: &[(f32, f32)], segments: usize) -> MeshData {
    let segments = segments.max(3);
    grid(profile.len().saturating_sub(1), segments, |row, col| {
        let (r, y) = profile[row];
        let phi = col as f32 * TAU / segments as f32;
        [r * phi.cos(), y, r * phi.sin()]
    })
}


fn sphere(radius: f32, width_segments: usize, height_segments: usize) -> MeshData {
    let height_segments = height_segments.max(2);
    let profile = (0..=height_segments)
        .map(|lat| {
            let theta = lat as f32 * PI / height_segments as f32;
            (radius * theta.sin(), radius * theta.cos())
        })
        .collect::<Vec<_>>();
    lathe(&profile, width_segments)
}


fn capsule(radius: f32, length: f32, cap_segments: usize, radial_segments: usize) -> MeshData {
    let cap_segments = cap_segments.max(1);
    let half = length / 2.0;
    let mut profile = Vec::with_capacity(2 * cap_segments + 2);
    for i in 0..=cap_segments {
        let theta = i as f32 * FRAC_PI_2 / cap_segments as f32;
        profile.push((radius * theta.sin(), half + radius * theta.cos()));
    }
    for i in 0..=cap_segments {
        let theta = FRAC_PI_2 + i as f32 * FRAC_PI_2 / cap_segments as f32;
        profile.push((radius * theta.sin(), -half + radius * theta.cos()));
    }
    lathe(&profile, radial_segments)
}


/// Capped frustum. A zero top radius makes a cone without a top cap.
fn cylinder(radius_top: f32, radius_bottom: f32, height: f32, segments: usize) -> MeshData {
    let half = height / 2.0;
    let mut profile = Vec::with_capacity(6);
    if radius_top > 0.0 {
        profile.push((0.0, half));
        profile.push((radius_top, half));
    }
    // repeated rim rows keep the cap and side normals apart
    profile.push((radius_top, half));
    profile.push((radius_bottom, -half));
    if radius_bottom > 0.0 {
        profile.push((radius_bottom, -half));
        profile.push((0.0, -half));
    }
    lathe(&profile, segments)
}


fn cuboid(width: f32, height: f32, depth: f32) -> MeshData {
    let (hx, hy, hz) = (width / 2.0, height / 2.0, depth / 2.0);
    let x = [hx, 0.0, 0.0];
    let y = [0.0, hy, 0.0];
    let z = [0.0, 0.0, hz];
    let neg = |v: [f32; 3]| [-v[0], -v[1], -v[2]];

    // (normal, u, v) with u x v along the normal
    let faces = [
        (x, y, z),
        (neg(x), z, y),
        (y, z, x),
        (neg(y), x, z),
        (z, x, y),
        (neg(z), y, x),
    ];

    let mut mesh = MeshData::default();
    for (n, u, v) in faces {
        let corner = |su: f32, sv: f32| {
            [
                n[0] + su * u[0] + sv * v[0],
                n[1] + su * u[1] + sv * v[1],
                n[2] + su * u[2] + sv * v[2],
            ]
        };
        let a = mesh.push(corner(-1.0, -1.0));
        let b = mesh.push(corner(1.0, -1.0));
        let c = mesh.push(corner(1.0, 1.0));
        let d = mesh.push(corner(-1.0, 1.0));
        mesh.indices.extend_from_slice(&[a, b, c, a, c, d]);
    }
    mesh
}


/// Torus around the Z axis.
fn torus(radius: f32, tube: f32, radial_segments: usize, tubular_segments: usize) -> MeshData {
    let radial_segments = radial_segments.max(3);
    let tubular_segments = tubular_segments.max(3);
    grid(radial_segments, tubular_segments, |row, col| {
        let v = row as f32 * TAU / radial_segments as f32;
        let u = col as f32 * TAU / tubular_segments as f32;
        let r = radius + tube * v.cos();
        [r * u.cos(), r * u.sin(), tube * v.sin()]
    })
}


/// Annular sector in the XY plane. An inner radius of zero gives a disc.
fn ring(
    inner_radius: f32,
    outer_radius: f32,
    segments: usize,
    theta_start: f32,
    theta_length: f32,
) -> MeshData {
    let segments = segments.max(3);
    let mut mesh = MeshData::default();
    let mut previous: Option<(u32, u32)> = None;
    for i in 0..=segments {
        let theta = theta_start + i as f32 * theta_length / segments as f32;
        let (sin, cos) = theta.sin_cos();
        let inner = mesh.push([inner_radius * cos, inner_radius * sin, 0.0]);
        let outer = mesh.push([outer_radius * cos, outer_radius * sin, 0.0]);
        if let Some((prev_inner, prev_outer)) = previous {
            mesh.indices.extend_from_slice(&[prev_inner, prev_outer, outer]);
            if inner_radius > 0.0 {
                mesh.indices.extend_from_slice(&[prev_inner, outer, inner]);
            }
        }
        previous = Some((inner, outer));
    }
    mesh
}


fn plane(width: f32, height: f32) -> MeshData {
    let (hw, hh) = (width / 2.0, height / 2.0);
    let mut mesh = MeshData::default();
    let a = mesh.push([-hw, -hh, 0.0]);
    let b = mesh.push([hw, -hh, 0.0]);
    let c = mesh.push([hw, hh, 0.0]);
    let d = mesh.push([-hw, hh, 0.0]);
    mesh.indices.extend_from_slice(&[a, b, c, a, c, d]);
    mesh
}
