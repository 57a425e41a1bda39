//! KCL - Nintendo collision mesh.
//!
//! Describes static level collision as triangular prisms, partitioned
//! spatially by two levels of octree: a model octree choosing which
//! sub-model covers a region, and a per-model polygon octree listing the
//! triangles in each cell.
//!
//! ## Header (0x38 bytes, little endian)
//! ```text
//! [0x00] Version bytes 02 02 00 00
//! [0x04] OctreeOffset           (u32)
//! [0x08] ModelListOffset        (u32)
//! [0x0C] ModelCount             (u32)
//! [0x10] Min                    (3 × f32)
//! [0x1C] Max                    (3 × f32)
//! [0x28] CoordShift             (3 × u32)
//! [0x34] PrismCount             (u32)
//! ```
//!
//! ## Octree keys
//! Each octree node is eight `u32` keys. The top two bits select the child
//! kind, the low 30 bits carry its payload:
//! ```text
//! 00  divide - child node at node start + payload × 4
//! 10  leaf   - payload is a model index
//! 11  empty
//! ```
//!
//! ## Model header (0x3C bytes, offsets relative to the model)
//! ```text
//! [0x00] PositionsOffset        (u32)
//! [0x04] NormalsOffset          (u32)
//! [0x08] PrismsOffset           (u32)
//! [0x0C] PolygonOctreeOffset    (u32)
//! [0x10] Thickness (40.0)       (f32)
//! [0x14] Min                    (3 × f32)
//! [0x20] Mask                   (3 × u32)
//! [0x2C] Shift                  (3 × u32; [0] is the coordinate shift)
//! [0x38] SphereRadius (0.0)     (f32)
//! ```
//!
//! ## Prism (0x14 bytes)
//! ```text
//! [0x00] Length                 (f32)
//! [0x04] PositionIndex          (u16)
//! [0x06] DirectionIndex         (u16)  face normal
//! [0x08] NormalAIndex           (u16)  edge normals
//! [0x0A] NormalBIndex           (u16)
//! [0x0C] NormalCIndex           (u16)
//! [0x0E] CollisionFlags         (u16)
//! [0x10] GlobalIndex            (u32)
//! ```

use std::collections::{BTreeMap, HashMap};

use crate::math::Vec3f;
use crate::stream::{DataStream, Endian};
use crate::{Error, Result};

const PRISM_SIZE: u32 = 0x14;
const VEC3_SIZE: u32 = 0x0C;
const PAYLOAD_MASK: u32 = 0x3FFF_FFFF;

/// Guard against division by zero when rebuilding prism corners.
const EPSILON: f32 = 1.1921e-7;

/// How reconstructed vertices are de-duplicated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VertexMerge {
    /// Three vertices per triangle, no sharing.
    #[default]
    None,
    /// Collapse bit-identical vertices and re-index triangles.
    MergeEqual,
}

/// Knobs for [`Kcl::parse_with`].
#[derive(Debug, Clone)]
pub struct KclOptions {
    /// Vertex de-duplication policy.
    pub vertex_merge: VertexMerge,
    /// Also decode each model's polygon octree.
    pub parse_polygon_octree: bool,
    /// Octree depth limit.
    pub max_depth: usize,
}

impl Default for KclOptions {
    fn default() -> Self {
        Self {
            vertex_merge: VertexMerge::None,
            parse_polygon_octree: false,
            max_depth: 64,
        }
    }
}

/// A parsed KCL file.
#[derive(Debug, Clone)]
pub struct Kcl {
    /// Lower corner of the bounding box.
    pub min: Vec3f,
    /// Upper corner of the bounding box.
    pub max: Vec3f,
    /// Per-axis coordinate shift of the model octree.
    pub coord_shift: [u32; 3],
    /// Declared prism count (approximate in shipped files).
    pub prism_count: u32,
    /// Root of the model octree.
    pub octree: ModelOctree,
    /// Sub-models, indexed by [`OctreeNode::Model`].
    pub models: Vec<Model>,
}

/// One model-octree node.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOctree {
    /// Always eight children.
    pub children: Vec<OctreeNode>,
}

/// Child slot of a [`ModelOctree`].
#[derive(Debug, Clone, PartialEq)]
pub enum OctreeNode {
    /// Further subdivided.
    Divide(ModelOctree),
    /// Covered by the model at this index.
    Model(u32),
    /// No collision here.
    Empty,
}

/// A prism record as stored on disk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prism {
    /// Prism height along the edge opposite the position.
    pub length: f32,
    /// Index of the first corner in [`Model::positions`].
    pub position_index: u16,
    /// Face normal, indexing [`Model::normals`].
    pub direction_index: u16,
    /// First edge normal.
    pub normal_a_index: u16,
    /// Second edge normal.
    pub normal_b_index: u16,
    /// Third edge normal.
    pub normal_c_index: u16,
    /// Collision attribute flags.
    pub collision_flags: u16,
    /// Index of the prism across all models.
    pub global_index: u32,
}

/// A prism resolved to three corner positions.
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    /// Source record.
    pub prism: Prism,
    /// Corner positions.
    pub positions: [Vec3f; 3],
    /// Indices of the corners in [`Model::vertices`].
    pub indices: [u32; 3],
}

impl Triangle {
    /// Collision attribute flags.
    pub fn collision_flags(&self) -> u16 {
        self.prism.collision_flags
    }
}

/// Spatial index of triangles inside one model.
#[derive(Debug, Clone, PartialEq)]
pub enum PolygonOctree {
    /// Eight sub-cells.
    Branch(Vec<PolygonOctree>),
    /// Triangle indices in this cell.
    Leaf(Vec<u16>),
}

/// One collision sub-model.
#[derive(Debug, Clone)]
pub struct Model {
    /// Lower corner of the model.
    pub min: Vec3f,
    /// Per-axis coordinate masks.
    pub mask: [u32; 3],
    /// Shift values; the first is the coordinate shift.
    pub shift: [u32; 3],
    /// Raw position table.
    pub positions: Vec<Vec3f>,
    /// Raw normal table.
    pub normals: Vec<Vec3f>,
    /// Reconstructed triangles.
    pub triangles: Vec<Triangle>,
    /// Vertex buffer referenced by [`Triangle::indices`].
    pub vertices: Vec<Vec3f>,
    /// Top-level polygon octree cells, when requested.
    pub polygon_octree: Option<Vec<PolygonOctree>>,
}

impl Kcl {
    /// Parse a KCL file with default options.
    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::parse_with(data, &KclOptions::default())
    }

    /// Parse a KCL file.
    pub fn parse_with(data: &[u8], options: &KclOptions) -> Result<Self> {
        let _span = tracing::debug_span!("kcl_parse", len = data.len()).entered();

        let mut s = DataStream::new(data, Endian::Little);
        s.expect_bytes(&[2, 2, 0, 0], "KCL version")?;
        let octree_offset = s.u32()? as usize;
        let model_list_offset = s.u32()? as usize;
        let model_count = s.u32()? as usize;
        let min = s.vec3f()?;
        let max = s.vec3f()?;
        let coord_shift = s.u32x3()?;
        let prism_count = s.u32()?;

        s.assert_position(octree_offset)?;
        let octree = ModelOctree::parse(&mut s, 0, options.max_depth)?;

        s.assert_position(model_list_offset)?;
        let offsets = s.u32s(model_count)?;
        let mut models = Vec::with_capacity(model_count);
        for offset in offsets {
            s.seek(offset as usize)?;
            models.push(Model::parse(&mut s, options)?);
        }

        tracing::debug!(
            models = models.len(),
            triangles = models.iter().map(|m| m.triangles.len()).sum::<usize>(),
            "KCL parsed"
        );

        Ok(Self {
            min,
            max,
            coord_shift,
            prism_count,
            octree,
            models,
        })
    }
}

impl ModelOctree {
    fn parse(s: &mut DataStream<'_>, depth: usize, max_depth: usize) -> Result<Self> {
        let start = s.position();
        if depth >= max_depth {
            return Err(Error::TooDeeplyNested {
                offset: start,
                limit: max_depth,
            });
        }

        let keys = s.u32s(8)?;
        let mut children = Vec::with_capacity(8);
        for key in keys {
            let payload = key & PAYLOAD_MASK;
            children.push(match key >> 30 {
                0b00 => {
                    s.assert_position(start + payload as usize * 4)?;
                    OctreeNode::Divide(Self::parse(s, depth + 1, max_depth)?)
                }
                0b10 => OctreeNode::Model(payload),
                0b11 => OctreeNode::Empty,
                _ => return Err(Error::InvalidOctreeKey { offset: start, key }),
            });
        }
        Ok(Self { children })
    }
}

impl Model {
    fn parse(s: &mut DataStream<'_>, options: &KclOptions) -> Result<Self> {
        let start = s.position();
        let [positions_at, normals_at, prisms_at, octree_at] = [s.u32()?, s.u32()?, s.u32()?, s.u32()?];
        s.expect_f32(40.0, "KCL prism thickness")?;
        let min = s.vec3f()?;
        let mask = s.u32x3()?;
        let shift = s.u32x3()?;
        s.expect_f32(0.0, "KCL sphere radius")?;

        s.assert_position(start + positions_at as usize)?;
        let positions = read_vec3s(s, normals_at.saturating_sub(positions_at) / VEC3_SIZE)?;
        s.assert_position(start + normals_at as usize)?;
        let normals = read_vec3s(s, prisms_at.saturating_sub(normals_at) / VEC3_SIZE)?;
        s.assert_position(start + prisms_at as usize)?;

        let prism_count = octree_at.saturating_sub(prisms_at) / PRISM_SIZE;
        let mut triangles = Vec::new();
        let mut vertices = Vec::new();
        for i in 0..prism_count {
            let prism = Prism {
                length: s.f32()?,
                position_index: s.u16()?,
                direction_index: s.u16()?,
                normal_a_index: s.u16()?,
                normal_b_index: s.u16()?,
                normal_c_index: s.u16()?,
                collision_flags: s.u16()?,
                global_index: s.u32()?,
            };
            let corners = prism_corners(&prism, &positions, &normals)?;
            vertices.extend_from_slice(&corners);
            triangles.push(Triangle {
                prism,
                positions: corners,
                indices: [i * 3, i * 3 + 1, i * 3 + 2],
            });
        }

        let polygon_octree = if options.parse_polygon_octree {
            let base = start + octree_at as usize;
            s.seek(base)?;
            let cells = spatial_cell_count(mask, shift[0]);
            let keys = s.u32s(cells)?;
            let mut walk = PolygonWalk {
                cells_left: s.len(),
                s: &mut *s,
                max_depth: options.max_depth,
            };
            let mut roots = Vec::with_capacity(keys.len());
            for key in keys {
                roots.push(walk.cell(key, base, 0)?);
            }
            Some(roots)
        } else {
            None
        };

        let mut model = Self {
            min,
            mask,
            shift,
            positions,
            normals,
            triangles,
            vertices,
            polygon_octree,
        };
        if options.vertex_merge == VertexMerge::MergeEqual {
            model.merge_equal_vertices();
        }
        Ok(model)
    }

    /// Collapse bit-identical vertices, keeping first-seen order.
    fn merge_equal_vertices(&mut self) {
        let mut seen: HashMap<[u32; 3], u32> = HashMap::new();
        let mut merged = Vec::new();
        for tri in &mut self.triangles {
            for index in &mut tri.indices {
                let v = self.vertices[*index as usize];
                *index = *seen.entry(v.to_bits()).or_insert_with(|| {
                    merged.push(v);
                    merged.len() as u32 - 1
                });
            }
        }
        self.vertices = merged;
    }

    /// Group triangles by their collision flags.
    pub fn faces_by_collision_flag(&self) -> BTreeMap<u16, Vec<&Triangle>> {
        let mut map: BTreeMap<u16, Vec<&Triangle>> = BTreeMap::new();
        for tri in &self.triangles {
            map.entry(tri.collision_flags()).or_default().push(tri);
        }
        map
    }
}

/// Depth-first walk over one model's polygon octree.
///
/// Cells may share children, so the walk is capped at one visited cell per
/// byte of input.
struct PolygonWalk<'s, 'a> {
    s: &'s mut DataStream<'a>,
    cells_left: usize,
    max_depth: usize,
}

impl PolygonWalk<'_, '_> {
    fn cell(&mut self, key: u32, base: usize, depth: usize) -> Result<PolygonOctree> {
        let offset = base + (key & PAYLOAD_MASK) as usize;
        if depth >= self.max_depth {
            return Err(Error::TooDeeplyNested {
                offset,
                limit: self.max_depth,
            });
        }
        self.cells_left = self.cells_left.checked_sub(1).ok_or(Error::CorruptStream {
            offset,
            reason: "polygon octree visits more cells than the file can hold",
        })?;

        if key >> 31 == 1 {
            // Leaf lists start one u16 past the payload offset.
            self.s.seek(offset + 2)?;
            let mut indices = Vec::new();
            loop {
                match self.s.u16()? {
                    0xFFFF => break,
                    i => indices.push(i),
                }
            }
            Ok(PolygonOctree::Leaf(indices))
        } else {
            self.s.seek(offset)?;
            let keys = self.s.u32s(8)?;
            let mut children = Vec::with_capacity(8);
            for key in keys {
                children.push(self.cell(key, offset, depth + 1)?);
            }
            Ok(PolygonOctree::Branch(children))
        }
    }
}

fn read_vec3s(s: &mut DataStream<'_>, count: u32) -> Result<Vec<Vec3f>> {
    (0..count).map(|_| s.vec3f()).collect()
}

/// Number of top-level polygon octree cells for a model.
fn spatial_cell_count(mask: [u32; 3], coord_shift: u32) -> usize {
    mask.iter()
        .map(|&m| (!m).checked_shr(coord_shift).unwrap_or(0) as u64 + 1)
        .product::<u64>()
        .try_into()
        .unwrap_or(usize::MAX)
}

fn lookup(table: &[Vec3f], index: u16, name: &'static str) -> Result<Vec3f> {
    table.get(index as usize).copied().ok_or(Error::IndexOutOfRange {
        table: name,
        index: index as usize,
        len: table.len(),
    })
}

/// Rebuild the three corners of a prism from its position, face normal and
/// edge normals.
fn prism_corners(prism: &Prism, positions: &[Vec3f], normals: &[Vec3f]) -> Result<[Vec3f; 3]> {
    let p = lookup(positions, prism.position_index, "KCL position")?;
    let direction = lookup(normals, prism.direction_index, "KCL normal")?;
    let normal_a = lookup(normals, prism.normal_a_index, "KCL normal")?;
    let normal_b = lookup(normals, prism.normal_b_index, "KCL normal")?;
    let normal_c = lookup(normals, prism.normal_c_index, "KCL normal")?;

    let cross_a = normal_a.cross(direction);
    let cross_b = normal_b.cross(direction);
    let factor_a = prism.length / away_from_zero(cross_a.dot(normal_c));
    let factor_b = prism.length / away_from_zero(cross_b.dot(normal_c));

    Ok([p, p + cross_b * factor_b, p + cross_a * factor_a])
}

fn away_from_zero(d: f32) -> f32 {
    if d >= 0.0 { d.max(EPSILON) } else { d }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_count_per_axis() {
        assert_eq!(spatial_cell_count([u32::MAX; 3], 0), 1);
        // ~0xFFFF_FFF0 = 0xF → 16 per axis before shifting.
        assert_eq!(spatial_cell_count([0xFFFF_FFF0; 3], 2), 4 * 4 * 4);
    }

    #[test]
    fn corners_from_normals() {
        let prism = Prism {
            length: 2.0,
            position_index: 0,
            direction_index: 0,
            normal_a_index: 1,
            normal_b_index: 2,
            normal_c_index: 3,
            collision_flags: 0,
            global_index: 0,
        };
        let positions = [Vec3f::new(1.0, 0.0, 0.0)];
        let normals = [
            Vec3f::new(0.0, 1.0, 0.0),
            Vec3f::new(1.0, 0.0, 0.0),
            Vec3f::new(0.0, 0.0, 1.0),
            Vec3f::new(-1.0, 0.0, 1.0),
        ];
        let corners = prism_corners(&prism, &positions, &normals).unwrap();
        assert_eq!(
            corners,
            [
                Vec3f::new(1.0, 0.0, 0.0),
                Vec3f::new(-1.0, 0.0, 0.0),
                Vec3f::new(1.0, 0.0, 2.0),
            ]
        );
    }

    #[test]
    fn bad_normal_index() {
        let prism = Prism {
            length: 1.0,
            position_index: 0,
            direction_index: 9,
            normal_a_index: 0,
            normal_b_index: 0,
            normal_c_index: 0,
            collision_flags: 0,
            global_index: 0,
        };
        let err = prism_corners(&prism, &[Vec3f::default()], &[Vec3f::default()]).unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange { index: 9, len: 1, .. }));
    }
}
