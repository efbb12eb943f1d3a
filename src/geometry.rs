use std::collections::HashSet;
use std::f32::consts::PI;

use bytemuck::{Pod, Zeroable};
use cgmath::{vec3, InnerSpace, Vector3};

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

pub struct Mesh {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Line-list indices covering every distinct triangle edge once.
    pub fn wireframe_indices(&self) -> Vec<u32> {
        let mut seen = HashSet::new();
        let mut lines = Vec::new();
        for tri in self.indices.chunks_exact(3) {
            for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
                if seen.insert((a.min(b), a.max(b))) {
                    lines.push(a);
                    lines.push(b);
                }
            }
        }
        lines
    }
}

/// A (p, q) torus knot swept by a circular tube.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TorusKnot {
    pub radius: f32,
    pub tube: f32,
    pub tubular_segments: u32,
    pub radial_segments: u32,
    pub p: u32,
    pub q: u32,
}

impl TorusKnot {
    pub fn centerpiece() -> Self {
        Self {
            radius: 1.0,
            tube: 0.3,
            tubular_segments: 128,
            radial_segments: 16,
            p: 2,
            q: 3,
        }
    }

    pub fn curve_point(&self, u: f32) -> Vector3<f32> {
        let (su, cu) = u.sin_cos();
        let qu_over_p = self.q as f32 / self.p as f32 * u;
        let cs = qu_over_p.cos();
        vec3(
            self.radius * (2.0 + cs) * 0.5 * cu,
            self.radius * (2.0 + cs) * 0.5 * su,
            self.radius * qu_over_p.sin() * 0.5,
        )
    }

    fn curve_parameter(&self, segment: u32) -> f32 {
        segment as f32 / self.tubular_segments as f32 * self.p as f32 * PI * 2.0
    }

    /// Points on the centre line, one per tubular segment.
    pub fn curve_samples(&self) -> Vec<Vector3<f32>> {
        (0..self.tubular_segments)
            .map(|j| self.curve_point(self.curve_parameter(j)))
            .collect()
    }

    pub fn mesh(&self) -> Mesh {
        let radial = self.radial_segments;
        let mut vertices =
            Vec::with_capacity(((self.tubular_segments + 1) * (radial + 1)) as usize);

        for j in 0..=self.tubular_segments {
            let u = self.curve_parameter(j);
            let p1 = self.curve_point(u);
            let p2 = self.curve_point(u + 0.01);

            // Frenet-like frame along the curve
            let tangent = p2 - p1;
            let mut normal = p2 + p1;
            let binormal = tangent.cross(normal).normalize();
            normal = binormal.cross(tangent).normalize();

            for i in 0..=radial {
                let v = i as f32 / radial as f32 * PI * 2.0;
                let cx = -self.tube * v.cos();
                let cy = self.tube * v.sin();
                let position = p1 + normal * cx + binormal * cy;
                let surface_normal = (position - p1).normalize();
                vertices.push(MeshVertex {
                    position: position.into(),
                    normal: surface_normal.into(),
                });
            }
        }

        let mut indices = Vec::with_capacity((self.tubular_segments * radial * 6) as usize);
        for j in 1..=self.tubular_segments {
            for i in 1..=radial {
                let a = (radial + 1) * (j - 1) + (i - 1);
                let b = (radial + 1) * j + (i - 1);
                let c = (radial + 1) * j + i;
                let d = (radial + 1) * (j - 1) + i;
                indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }

        Mesh { vertices, indices }
    }
}

/// Axis-aligned cube centred on the origin with per-face normals.
pub fn cube(size: f32) -> Mesh {
    let h = size * 0.5;
    // (normal, u, v) with u x v == normal so each quad winds counter-clockwise
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, u, v) in faces {
        let (n, u, v) = (Vector3::from(normal), Vector3::from(u), Vector3::from(v));
        let base = vertices.len() as u32;
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let position = (n + u * su + v * sv) * h;
            vertices.push(MeshVertex {
                position: position.into(),
                normal,
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    Mesh { vertices, indices }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_normal(mesh: &Mesh, tri: &[u32]) -> Vector3<f32> {
        let p = |i: u32| Vector3::from(mesh.vertices[i as usize].position);
        (p(tri[1]) - p(tri[0])).cross(p(tri[2]) - p(tri[0]))
    }

    #[test]
    fn torus_knot_counts() {
        let knot = TorusKnot::centerpiece();
        let mesh = knot.mesh();
        assert_eq!(mesh.vertices.len(), 129 * 17);
        assert_eq!(mesh.indices.len(), 128 * 16 * 6);
        assert_eq!(knot.curve_samples().len(), 128);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
    }

    #[test]
    fn torus_knot_stays_inside_its_bounds() {
        let knot = TorusKnot::centerpiece();
        // Centre line radius lies in [0.5, 1.5]; the tube adds 0.3 on top.
        for sample in knot.curve_samples() {
            let planar = (sample.x * sample.x + sample.y * sample.y).sqrt();
            assert!(planar >= 0.5 - 1e-4 && planar <= 1.5 + 1e-4);
            assert!(sample.z.abs() <= 0.5 + 1e-4);
        }
        for vertex in knot.mesh().vertices {
            let n = Vector3::from(vertex.normal);
            assert!((n.magnitude() - 1.0).abs() < 1e-3);
            assert!(Vector3::from(vertex.position).magnitude() <= 1.8 + 1e-3);
        }
    }

    #[test]
    fn cube_faces_point_outward() {
        let mesh = cube(0.3);
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.indices.len(), 36);
        for tri in mesh.indices.chunks_exact(3) {
            let normal = Vector3::from(mesh.vertices[tri[0] as usize].normal);
            assert!(triangle_normal(&mesh, tri).dot(normal) > 0.0);
        }
        for vertex in &mesh.vertices {
            for c in vertex.position {
                assert!((c.abs() - 0.15).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn wireframe_lists_each_edge_once() {
        // Each face has 4 border edges shared by index only within the face,
        // plus one diagonal.
        let lines = cube(1.0).wireframe_indices();
        assert_eq!(lines.len(), 6 * 5 * 2);

        let knot = TorusKnot::centerpiece().mesh();
        let edges = knot.wireframe_indices();
        assert_eq!(edges.len() % 2, 0);
        assert!(edges.len() < knot.indices.len() * 2);
    }
}
