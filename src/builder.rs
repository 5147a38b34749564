//! Meshlet emission: drives the primitive cache over an index stream and
//! assembles the output buffers a cluster renderer consumes

use crate::bitfield::{aligned_size, get_bit_field, pack, set_bit_field, unpack};
use crate::cache::PrimitiveCache;
use crate::octahedral::to_oct_precise;
use crate::quantize::quantize_snorm;
use crate::stats::Stats;
use crate::vector::Vec3;
use crate::{PackingConfig, Position};

use thiserror::Error;

/// Validation failures reported by [PackedMeshlets::validate].
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("packed primitive region or local index out of bounds")]
    PrimOutOfBounds,
    #[error("vertex region or vertex index out of bounds")]
    VertexOutOfBounds,
    #[error("packed triangles do not match the source index stream")]
    MismatchIndices,
}

/// Fixed-size per-meshlet record, four words as consumed by GPU decoders.
///
/// Counts, bit widths and buffer offsets are packed with the bit-field codec;
/// the layout is:
///
/// * word 0: bits 0..8 vertex count minus one, bits 8..16 triangle count
///   minus one, bits 16..22 vertex delta width, bits 24..28 primitive bits
/// * word 1: offset into the vertex index buffer
/// * word 2: word offset into the packed primitive buffer
/// * word 3: reserved
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct MeshletDesc {
    pub fields: [u32; 4],
}

impl MeshletDesc {
    fn new(
        vertex_count: u32,
        triangle_count: u32,
        vertex_offset: u32,
        prim_offset: u32,
        vertex_delta_bits: u32,
        primitive_bits: u32,
    ) -> Self {
        debug_assert!(vertex_count >= 1 && vertex_count <= 256);
        debug_assert!(triangle_count >= 1 && triangle_count <= 256);
        debug_assert!(vertex_delta_bits <= 32);
        debug_assert!(primitive_bits >= 1 && primitive_bits <= 8);

        Self {
            fields: [
                pack(vertex_count - 1, 8, 0)
                    | pack(triangle_count - 1, 8, 8)
                    | pack(vertex_delta_bits, 6, 16)
                    | pack(primitive_bits, 4, 24),
                vertex_offset,
                prim_offset,
                0,
            ],
        }
    }

    pub fn vertex_count(&self) -> u32 {
        unpack(self.fields[0], 8, 0) + 1
    }

    pub fn triangle_count(&self) -> u32 {
        unpack(self.fields[0], 8, 8) + 1
    }

    /// Delta width the meshlet's vertex indices fit in, for delta-coded consumers.
    pub fn vertex_delta_bits(&self) -> u32 {
        unpack(self.fields[0], 6, 16)
    }

    /// Field width of one local vertex reference in the packed primitive buffer.
    pub fn primitive_bits(&self) -> u32 {
        unpack(self.fields[0], 4, 24)
    }

    pub fn vertex_offset(&self) -> u32 {
        self.fields[1]
    }

    pub fn primitive_offset(&self) -> u32 {
        self.fields[2]
    }
}

/// Axis-aligned bounds of one meshlet, for frustum and occlusion culling.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeshletBbox {
    pub bbox_min: Vec3,
    pub bbox_max: Vec3,
}

impl Default for MeshletBbox {
    fn default() -> Self {
        Self {
            bbox_min: Vec3::splat(f32::MAX),
            bbox_max: Vec3::splat(-f32::MAX),
        }
    }
}

/// Output of [pack_meshlets]: descriptors plus the flat buffers they index.
#[derive(Clone, Default, Debug)]
pub struct PackedMeshlets {
    pub descriptors: Vec<MeshletDesc>,
    /// Original mesh vertex indices, one region per meshlet, local index order.
    pub vertex_indices: Vec<u32>,
    /// Bit-packed local index triples, one word-aligned region per meshlet.
    pub primitive_data: Vec<u32>,
    pub stats: Stats,
}

impl PackedMeshlets {
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Vertex index buffer region of one meshlet.
    pub fn meshlet_vertices(&self, meshlet: usize) -> &[u32] {
        let desc = &self.descriptors[meshlet];
        let offset = desc.vertex_offset() as usize;

        &self.vertex_indices[offset..offset + desc.vertex_count() as usize]
    }

    /// Decodes one triangle of a meshlet as local vertex indices.
    pub fn local_triangle(&self, meshlet: usize, triangle: usize) -> [u32; 3] {
        let desc = &self.descriptors[meshlet];

        debug_assert!(triangle < desc.triangle_count() as usize);

        let words = &self.primitive_data[desc.primitive_offset() as usize..];
        let width = desc.primitive_bits();
        let base = triangle as u32 * 3 * width;

        [
            get_bit_field(words, width, base),
            get_bit_field(words, width, base + width),
            get_bit_field(words, width, base + 2 * width),
        ]
    }

    /// Decodes one triangle of a meshlet, resolved to original mesh indices.
    pub fn triangle(&self, meshlet: usize, triangle: usize) -> [u32; 3] {
        let vertices = self.meshlet_vertices(meshlet);

        self.local_triangle(meshlet, triangle).map(|local| vertices[local as usize])
    }

    /// Re-resolves every packed triangle against the source stream.
    ///
    /// Checks that all descriptor regions lie inside the buffers, that local
    /// indices stay inside their meshlet's vertex region, that resolved
    /// indices are below `vertex_count`, and that the resolved triangles
    /// reproduce `indices` in order (degenerate source triangles excluded).
    pub fn validate(&self, indices: &[u32], vertex_count: usize) -> Result<(), ValidationError> {
        let mut source = indices
            .chunks_exact(3)
            .filter(|abc| abc[0] != abc[1] && abc[0] != abc[2] && abc[1] != abc[2]);

        for (m, desc) in self.descriptors.iter().enumerate() {
            let vertex_end = desc.vertex_offset() as usize + desc.vertex_count() as usize;
            if vertex_end > self.vertex_indices.len() {
                return Err(ValidationError::VertexOutOfBounds);
            }

            let prim_bits = desc.triangle_count() * 3 * desc.primitive_bits();
            let prim_end = desc.primitive_offset() + aligned_size(prim_bits, 32) / 32;
            if prim_end as usize > self.primitive_data.len() {
                return Err(ValidationError::PrimOutOfBounds);
            }

            for t in 0..desc.triangle_count() as usize {
                let local = self.local_triangle(m, t);
                if local.iter().any(|&l| l >= desc.vertex_count()) {
                    return Err(ValidationError::PrimOutOfBounds);
                }

                let resolved = self.triangle(m, t);
                if resolved.iter().any(|&v| v as usize >= vertex_count) {
                    return Err(ValidationError::VertexOutOfBounds);
                }

                match source.next() {
                    Some(abc) if abc == resolved => {}
                    _ => return Err(ValidationError::MismatchIndices),
                }
            }
        }

        if source.next().is_some() {
            return Err(ValidationError::MismatchIndices);
        }

        Ok(())
    }
}

/// Splits a triangle stream into meshlets honoring the configured limits.
///
/// Triangles are consumed in order; a new meshlet starts whenever the next
/// triangle fails the feasibility test of the current one. Degenerate
/// triangles never consume capacity and are absent from the output.
///
/// # Example
///
/// ```
/// use meshlet_pack::PackingConfig;
/// use meshlet_pack::builder::pack_meshlets;
///
/// // two triangles sharing an edge
/// let indices = [0, 1, 2, 2, 1, 3];
/// let packed = pack_meshlets(&indices, 4, &PackingConfig::default());
///
/// assert_eq!(packed.len(), 1);
/// assert_eq!(packed.triangle(0, 1), [2, 1, 3]);
/// assert!(packed.validate(&indices, 4).is_ok());
/// ```
pub fn pack_meshlets(indices: &[u32], vertex_count: usize, config: &PackingConfig) -> PackedMeshlets {
    assert!(indices.len() % 3 == 0);
    // every local index must be expressible at the configured field width
    assert!(config.max_vertex_size <= 1 << config.primitive_bits);

    let mut cache = PrimitiveCache::new(config);
    let use_block = config.max_block_bits.is_some();

    let mut packed = PackedMeshlets::default();

    for abc in indices.chunks_exact(3) {
        let tri = [abc[0], abc[1], abc[2]];

        assert!(tri.iter().all(|&i| (i as usize) < vertex_count));

        let exhausted = if use_block {
            cache.cannot_insert_block(tri)
        } else {
            cache.cannot_insert(tri)
        };

        if exhausted {
            finalize_meshlet(&mut packed, &cache, config);
            cache.reset();
        }

        cache.insert(tri);
    }

    if !cache.is_empty() {
        finalize_meshlet(&mut packed, &cache, config);
    }

    packed
}

fn finalize_meshlet(packed: &mut PackedMeshlets, cache: &PrimitiveCache, config: &PackingConfig) {
    let vertex_offset = packed.vertex_indices.len() as u32;
    packed.vertex_indices.extend_from_slice(cache.vertices());

    let prim_offset = packed.primitive_data.len() as u32;
    let prim_bits = cache.triangle_count() * 3 * config.primitive_bits;
    let prim_words = (aligned_size(prim_bits, 32) / 32) as usize;
    packed
        .primitive_data
        .resize(packed.primitive_data.len() + prim_words, 0);

    let words = &mut packed.primitive_data[prim_offset as usize..];
    for (t, tri) in cache.triangles().iter().enumerate() {
        for (k, &local) in tri.iter().enumerate() {
            let offset = (t * 3 + k) as u32 * config.primitive_bits;
            set_bit_field(words, config.primitive_bits, offset, local as u32);
        }
    }

    packed.descriptors.push(MeshletDesc::new(
        cache.vertex_count(),
        cache.triangle_count(),
        vertex_offset,
        prim_offset,
        cache.vertex_delta_bits(),
        config.primitive_bits,
    ));

    let stats = &mut packed.stats;

    stats.meshlets_total += 1;
    stats.prim_total += cache.triangle_count() as usize;
    stats.prim_indices += prim_words * 32 / config.primitive_bits as usize;
    stats.vertex_total += cache.vertex_count() as usize;
    stats.vertex_indices += cache.vertex_count() as usize;

    let primload = cache.triangle_count() as f64 / config.max_primitive_size as f64;
    let vertexload = cache.vertex_count() as f64 / config.max_vertex_size as f64;

    stats.primload_sum += primload;
    stats.primload_sq_sum += primload * primload;
    stats.vertexload_sum += vertexload;
    stats.vertexload_sq_sum += vertexload * vertexload;
}

/// Axis-aligned bounds over one meshlet's vertex positions.
pub fn compute_meshlet_bbox<V: Position>(packed: &PackedMeshlets, meshlet: usize, vertices: &[V]) -> MeshletBbox {
    let mut bbox = MeshletBbox::default();

    for &index in packed.meshlet_vertices(meshlet) {
        let p = Vec3::from_array(vertices[index as usize].pos());

        bbox.bbox_min = bbox.bbox_min.min(p);
        bbox.bbox_max = bbox.bbox_max.max(p);
    }

    bbox
}

/// Representative orientation of one meshlet, octahedral-encoded to 8-bit
/// snorm per axis.
///
/// The orientation is the area-weighted average of the triangle normals, the
/// axis a backface-culling cone would be built around. Returns the zero
/// encoding when the normals cancel out (such meshlets cannot be cone
/// culled).
pub fn compute_meshlet_orientation<V: Position>(packed: &PackedMeshlets, meshlet: usize, vertices: &[V]) -> [i8; 2] {
    let desc = &packed.descriptors[meshlet];

    let mut normal_sum = Vec3::default();

    for t in 0..desc.triangle_count() as usize {
        let [a, b, c] = packed.triangle(meshlet, t);

        let p0 = Vec3::from_array(vertices[a as usize].pos());
        let p1 = Vec3::from_array(vertices[b as usize].pos());
        let p2 = Vec3::from_array(vertices[c as usize].pos());

        // cross product length is twice the triangle area
        normal_sum = normal_sum + (p1 - p0).cross(p2 - p0);
    }

    if normal_sum.length() == 0.0 {
        return [0, 0];
    }

    let e = to_oct_precise(normal_sum.normalize(), 16);

    [quantize_snorm(e.x, 8) as i8, quantize_snorm(e.y, 8) as i8]
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::octahedral::from_oct;

    struct Vertex {
        p: [f32; 3],
    }

    impl Position for Vertex {
        fn pos(&self) -> [f32; 3] {
            self.p
        }
    }

    // 8 corners of the unit cube, vertex i at (i&1, (i>>1)&1, (i>>2)&1)
    fn cube_vertices() -> Vec<Vertex> {
        (0..8)
            .map(|i| Vertex {
                p: [(i & 1) as f32, ((i >> 1) & 1) as f32, ((i >> 2) & 1) as f32],
            })
            .collect()
    }

    fn cube_indices() -> Vec<u32> {
        vec![
            0, 1, 2, 1, 3, 2, // z = 0
            4, 6, 5, 5, 6, 7, // z = 1
            0, 4, 1, 1, 4, 5, // y = 0
            2, 3, 6, 3, 7, 6, // y = 1
            0, 2, 4, 2, 6, 4, // x = 0
            1, 5, 3, 3, 5, 7, // x = 1
        ]
    }

    fn strip_indices(triangles: usize) -> Vec<u32> {
        let mut indices = Vec::with_capacity(triangles * 3);

        for i in 0..triangles as u32 {
            if i % 2 == 0 {
                indices.extend_from_slice(&[i, i + 1, i + 2]);
            } else {
                indices.extend_from_slice(&[i + 1, i, i + 2]);
            }
        }

        indices
    }

    #[test]
    fn test_cube_packs_into_one_meshlet() {
        let indices = cube_indices();
        let config = PackingConfig {
            max_vertex_size: 8,
            max_primitive_size: 12,
            ..Default::default()
        };

        let packed = pack_meshlets(&indices, 8, &config);

        assert_eq!(packed.len(), 1);
        assert_eq!(packed.descriptors[0].vertex_count(), 8);
        assert_eq!(packed.descriptors[0].triangle_count(), 12);
        assert!(packed.validate(&indices, 8).is_ok());
    }

    #[test]
    fn test_strip_splits_into_multiple_meshlets() {
        let indices = strip_indices(300);
        let config = PackingConfig {
            max_vertex_size: 64,
            max_primitive_size: 126,
            ..Default::default()
        };

        let packed = pack_meshlets(&indices, 302, &config);

        assert!(packed.len() > 1);
        assert!(packed.validate(&indices, 302).is_ok());

        let mut prims = 0;
        for desc in &packed.descriptors {
            assert!(desc.vertex_count() <= 64);
            assert!(desc.triangle_count() <= 126);
            prims += desc.triangle_count() as usize;
        }

        assert_eq!(prims, 300);
        assert_eq!(packed.stats.prim_total, 300);
        assert_eq!(packed.stats.meshlets_total, packed.len());
    }

    #[test]
    fn test_round_trip_fidelity() {
        let indices = strip_indices(40);
        let packed = pack_meshlets(&indices, 42, &PackingConfig::default());

        let mut t = 0;
        for m in 0..packed.len() {
            for tri in 0..packed.descriptors[m].triangle_count() as usize {
                assert_eq!(packed.triangle(m, tri), [indices[t], indices[t + 1], indices[t + 2]]);
                t += 3;
            }
        }

        assert_eq!(t, indices.len());
    }

    #[test]
    fn test_degenerate_triangles_are_dropped() {
        let indices = [0, 1, 2, 5, 5, 9, 2, 1, 3];
        let packed = pack_meshlets(&indices, 10, &PackingConfig::default());

        assert_eq!(packed.len(), 1);
        assert_eq!(packed.descriptors[0].triangle_count(), 2);
        assert_eq!(packed.triangle(0, 1), [2, 1, 3]);
        assert!(packed.validate(&indices, 10).is_ok());
    }

    #[test]
    fn test_packing_is_deterministic() {
        let indices = strip_indices(200);
        let config = PackingConfig {
            max_vertex_size: 32,
            max_primitive_size: 40,
            max_block_bits: Some(1024),
            ..Default::default()
        };

        let a = pack_meshlets(&indices, 202, &config);
        let b = pack_meshlets(&indices, 202, &config);

        assert_eq!(a.descriptors, b.descriptors);
        assert_eq!(a.vertex_indices, b.vertex_indices);
        assert_eq!(a.primitive_data, b.primitive_data);
    }

    #[test]
    fn test_block_budget_is_honored() {
        let indices = strip_indices(300);
        let budget = 512;
        let config = PackingConfig {
            max_vertex_size: 64,
            max_primitive_size: 126,
            max_block_bits: Some(budget),
            ..Default::default()
        };

        let packed = pack_meshlets(&indices, 302, &config);

        assert!(packed.len() > 1);
        assert!(packed.validate(&indices, 302).is_ok());

        for desc in &packed.descriptors {
            let bits = (desc.vertex_count() - 1) * desc.vertex_delta_bits()
                + (desc.triangle_count() - 1) * 3 * desc.primitive_bits();

            assert!(bits <= budget);
        }
    }

    #[test]
    fn test_validate_detects_corruption() {
        let indices = cube_indices();
        let config = PackingConfig {
            max_vertex_size: 8,
            max_primitive_size: 12,
            ..Default::default()
        };

        let mut packed = pack_meshlets(&indices, 8, &config);

        packed.vertex_indices[3] ^= 1;

        assert!(packed.validate(&indices, 8).is_err());
    }

    #[test]
    fn test_cube_bbox() {
        let indices = cube_indices();
        let config = PackingConfig {
            max_vertex_size: 8,
            max_primitive_size: 12,
            ..Default::default()
        };

        let packed = pack_meshlets(&indices, 8, &config);
        let bbox = compute_meshlet_bbox(&packed, 0, &cube_vertices());

        assert_eq!(bbox.bbox_min, Vec3::splat(0.0));
        assert_eq!(bbox.bbox_max, Vec3::splat(1.0));
    }

    #[test]
    fn test_orientation_of_flat_patch() {
        // two coplanar triangles in the xy plane, wound to face +z
        let vertices: Vec<Vertex> = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]]
            .iter()
            .map(|&p| Vertex { p })
            .collect();
        let indices = [0, 1, 2, 2, 1, 3];

        let packed = pack_meshlets(&indices, 4, &PackingConfig::default());
        let oriented = compute_meshlet_orientation(&packed, 0, &vertices);

        let decoded = from_oct(Vec3::new(oriented[0] as f32 / 127.0, oriented[1] as f32 / 127.0, 0.0));

        assert!(decoded.dot(Vec3::new(0.0, 0.0, 1.0)) > 0.99);
    }

    #[test]
    fn test_orientation_of_cancelling_normals_is_zero() {
        let vertices: Vec<Vertex> = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]
            .iter()
            .map(|&p| Vertex { p })
            .collect();
        // the same triangle with both windings, normals cancel
        let indices = [0, 1, 2, 0, 2, 1];

        let packed = pack_meshlets(&indices, 3, &PackingConfig::default());

        assert_eq!(compute_meshlet_orientation(&packed, 0, &vertices), [0, 0]);
    }
}
