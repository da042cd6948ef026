//! Mesh geometry payload (vertices, polygons, per-loop UV layers)

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// A polygon as a range into the mesh loop array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Polygon {
    pub loop_start: usize,
    pub loop_total: usize,
}

/// A named UV layer with one coordinate per loop (face corner)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UvLayer {
    pub name: String,
    pub data: Vec<[f32; 2]>,
}

/// Geometry payload of a mesh entity
///
/// Polygons are stored flat: `loops` holds one vertex index per face corner and
/// each [`Polygon`] addresses a contiguous range of it. UV layers and the
/// per-polygon smooth flags are kept in step with that layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshData {
    /// Mesh data-block label
    pub name: String,
    pub vertices: Vec<[f32; 3]>,
    /// Vertex index for every loop
    pub loops: Vec<u32>,
    pub polygons: Vec<Polygon>,
    pub uv_layers: Vec<UvLayer>,
    /// Smooth-shading flag per polygon
    pub smooth: Vec<bool>,
}

impl MeshData {
    /// Create an empty mesh
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Create a mesh from vertex positions and polygon vertex-index lists
    pub fn from_polygons<P: AsRef<[u32]>>(
        name: impl Into<String>,
        vertices: Vec<[f32; 3]>,
        polygons: &[P],
    ) -> Self {
        let mut mesh = Self::new(name);
        mesh.set_geometry(vertices, polygons);
        mesh
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }

    /// Total number of face corners
    pub fn loop_count(&self) -> usize {
        self.loops.len()
    }

    pub fn has_geometry(&self) -> bool {
        !self.vertices.is_empty() || !self.polygons.is_empty()
    }

    /// Vertex indices of a single polygon
    pub fn polygon_vertices(&self, index: usize) -> &[u32] {
        let p = self.polygons[index];
        &self.loops[p.loop_start..p.loop_start + p.loop_total]
    }

    /// Vertex-index lists of all polygons, in order
    pub fn polygon_lists(&self) -> Vec<Vec<u32>> {
        (0..self.polygons.len())
            .map(|i| self.polygon_vertices(i).to_vec())
            .collect()
    }

    /// Remove vertices, polygons and all loop data including UV layers
    pub fn clear_geometry(&mut self) {
        self.vertices.clear();
        self.loops.clear();
        self.polygons.clear();
        self.smooth.clear();
        self.uv_layers.clear();
    }

    /// Append vertices and polygons verbatim
    ///
    /// Polygon indices are relative to the appended vertices. New polygons are
    /// flat shaded and existing UV layers are padded with zeroed loops.
    pub fn set_geometry<P: AsRef<[u32]>>(&mut self, vertices: Vec<[f32; 3]>, polygons: &[P]) {
        let offset = self.vertices.len() as u32;
        self.vertices.extend(vertices);

        for polygon in polygons {
            let corners = polygon.as_ref();
            self.polygons.push(Polygon {
                loop_start: self.loops.len(),
                loop_total: corners.len(),
            });
            self.loops.extend(corners.iter().map(|v| v + offset));
            self.smooth.push(false);
        }

        let loop_count = self.loops.len();
        for layer in &mut self.uv_layers {
            layer.data.resize(loop_count, [0.0; 2]);
        }
    }

    /// Add a UV layer with zeroed coordinates for every loop
    pub fn add_uv_layer(&mut self, name: impl Into<String>) -> &mut UvLayer {
        self.uv_layers.push(UvLayer {
            name: name.into(),
            data: vec![[0.0; 2]; self.loops.len()],
        });
        let last = self.uv_layers.len() - 1;
        &mut self.uv_layers[last]
    }

    pub fn uv_layer(&self, name: &str) -> Option<&UvLayer> {
        self.uv_layers.iter().find(|l| l.name == name)
    }

    pub fn remove_uv_layers(&mut self) {
        self.uv_layers.clear();
    }

    pub fn set_smooth_all(&mut self, smooth: bool) {
        self.smooth.iter_mut().for_each(|s| *s = smooth);
    }

    /// Transform every vertex position by a matrix
    pub fn transform_vertices(&mut self, matrix: &Mat4) {
        for v in &mut self.vertices {
            let p = matrix.transform_point3(Vec3::from(*v));
            *v = p.to_array();
        }
    }

    /// Validate the mesh structure, removing invalid polygons
    ///
    /// Polygons with fewer than three corners or referencing missing vertices
    /// are dropped together with their loops in every UV layer. Each removal is
    /// reported as a warning with the polygon's index before validation.
    pub fn validate(&mut self) -> Vec<MeshWarning> {
        let vertex_count = self.vertices.len() as u32;
        let mut warnings = Vec::new();
        let mut keep = Vec::with_capacity(self.polygons.len());

        for (index, polygon) in self.polygons.iter().enumerate() {
            let corners = &self.loops[polygon.loop_start..polygon.loop_start + polygon.loop_total];
            if corners.len() < 3 {
                warnings.push(MeshWarning::DegeneratePolygon {
                    polygon: index,
                    corners: corners.len(),
                });
                keep.push(false);
            } else if let Some(&vertex) = corners.iter().find(|&&v| v >= vertex_count) {
                warnings.push(MeshWarning::VertexOutOfRange {
                    polygon: index,
                    vertex,
                });
                keep.push(false);
            } else {
                keep.push(true);
            }
        }

        if warnings.is_empty() {
            return warnings;
        }

        let mut loops = Vec::with_capacity(self.loops.len());
        let mut polygons = Vec::new();
        let mut smooth = Vec::new();
        let mut uv_data: Vec<Vec<[f32; 2]>> = vec![Vec::new(); self.uv_layers.len()];

        for (index, polygon) in self.polygons.iter().enumerate() {
            if !keep[index] {
                continue;
            }
            let range = polygon.loop_start..polygon.loop_start + polygon.loop_total;
            polygons.push(Polygon {
                loop_start: loops.len(),
                loop_total: polygon.loop_total,
            });
            loops.extend_from_slice(&self.loops[range.clone()]);
            smooth.push(self.smooth.get(index).copied().unwrap_or(false));
            for (layer, data) in self.uv_layers.iter().zip(uv_data.iter_mut()) {
                if let Some(slice) = layer.data.get(range.clone()) {
                    data.extend_from_slice(slice);
                }
            }
        }

        self.loops = loops;
        self.polygons = polygons;
        self.smooth = smooth;
        for (layer, data) in self.uv_layers.iter_mut().zip(uv_data) {
            layer.data = data;
        }

        warnings
    }
}

/// Structural problem found (and repaired) by [`MeshData::validate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeshWarning {
    DegeneratePolygon { polygon: usize, corners: usize },
    VertexOutOfRange { polygon: usize, vertex: u32 },
}

impl std::fmt::Display for MeshWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeshWarning::DegeneratePolygon { polygon, corners } => {
                write!(f, "polygon {} has only {} corners", polygon, corners)
            }
            MeshWarning::VertexOutOfRange { polygon, vertex } => {
                write!(f, "polygon {} references missing vertex {}", polygon, vertex)
            }
        }
    }
}
