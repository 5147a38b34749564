//! Greedy primitive cache used to carve triangle streams into meshlets
//!
//! The cache simulates the fixed on-chip limits of cluster rasterization
//! hardware: it collects the unique vertex set referenced by a run of
//! triangles and is exhausted once either limit (or the optional bit budget)
//! would be exceeded. Callers probe feasibility with [PrimitiveCache::cannot_insert]
//! or [PrimitiveCache::cannot_insert_block] before committing a triangle with
//! [PrimitiveCache::insert]; insert itself never rejects.

use crate::bitfield::find_msb;
use crate::{PackingConfig, MAX_PRIMITIVE_COUNT_LIMIT, MAX_VERTEX_COUNT_LIMIT};

const UNUSED: u32 = !0;

fn is_degenerate(indices: [u32; 3]) -> bool {
    indices[0] == indices[1] || indices[0] == indices[2] || indices[1] == indices[2]
}

/// Fixed-capacity accumulator for one in-progress meshlet.
///
/// All storage is inline and sized to the hard encoding limits; the per-vertex
/// membership test is a linear scan, which at a few hundred entries beats the
/// bookkeeping cost of a hashed lookup and keeps the hot path allocation-free.
pub struct PrimitiveCache {
    primitives: [[u8; 3]; MAX_PRIMITIVE_COUNT_LIMIT],
    vertices: [u32; MAX_VERTEX_COUNT_LIMIT],
    num_prims: u32,
    num_vertices: u32,
    num_vertex_delta_bits: u32,
    num_vertex_all_bits: u32,

    max_vertex_size: u32,
    max_primitive_size: u32,
    primitive_bits: u32,
    max_block_bits: u32,
}

impl PrimitiveCache {
    pub fn new(config: &PackingConfig) -> Self {
        assert!(config.max_vertex_size >= 3 && config.max_vertex_size <= MAX_VERTEX_COUNT_LIMIT as u32);
        assert!(config.max_primitive_size >= 1 && config.max_primitive_size <= MAX_PRIMITIVE_COUNT_LIMIT as u32);
        assert!(config.primitive_bits >= 1 && config.primitive_bits <= 8);

        Self {
            primitives: [[0; 3]; MAX_PRIMITIVE_COUNT_LIMIT],
            vertices: [UNUSED; MAX_VERTEX_COUNT_LIMIT],
            num_prims: 0,
            num_vertices: 0,
            num_vertex_delta_bits: 0,
            num_vertex_all_bits: 0,
            max_vertex_size: config.max_vertex_size,
            max_primitive_size: config.max_primitive_size,
            primitive_bits: config.primitive_bits,
            max_block_bits: config.max_block_bits.unwrap_or(u32::MAX),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.num_vertices == 0
    }

    /// Number of distinct vertices currently held.
    pub fn vertex_count(&self) -> u32 {
        self.num_vertices
    }

    /// Number of triangles accepted so far.
    pub fn triangle_count(&self) -> u32 {
        self.num_prims
    }

    /// Original mesh indices of the held vertices, in local index order.
    pub fn vertices(&self) -> &[u32] {
        &self.vertices[..self.num_vertices as usize]
    }

    /// Accepted triangles as local index triples.
    pub fn triangles(&self) -> &[[u8; 3]] {
        &self.primitives[..self.num_prims as usize]
    }

    /// Widest XOR-delta against the first held vertex, in bits.
    pub fn vertex_delta_bits(&self) -> u32 {
        self.num_vertex_delta_bits
    }

    /// Widest raw index among the held vertices, in bits.
    pub fn vertex_all_bits(&self) -> u32 {
        self.num_vertex_all_bits
    }

    /// Discards all held state, transitioning back to empty.
    pub fn reset(&mut self) {
        self.num_prims = 0;
        self.num_vertices = 0;
        self.num_vertex_delta_bits = 0;
        self.num_vertex_all_bits = 0;
        self.vertices = [UNUSED; MAX_VERTEX_COUNT_LIMIT];
    }

    fn block_bits(&self, num_vertices: u32, num_prims: u32, delta_bits: u32) -> u32 {
        let vert_bits = num_vertices.saturating_sub(1) * delta_bits;
        let prim_bits = num_prims.saturating_sub(1) * 3 * self.primitive_bits;

        vert_bits + prim_bits
    }

    /// Whether the held contents fit the configured bit budget.
    pub fn fits_block(&self) -> bool {
        self.block_bits(self.num_vertices, self.num_prims, self.num_vertex_delta_bits) <= self.max_block_bits
    }

    fn count_found(&self, indices: [u32; 3]) -> u32 {
        let mut found = 0;

        for &v in self.vertices() {
            for idx in indices {
                if v == idx {
                    found += 1;
                }
            }
        }

        found
    }

    /// Capacity-only feasibility: true if accepting the triangle would exceed
    /// the vertex or primitive limit.
    ///
    /// Degenerate triangles are always insertable since [PrimitiveCache::insert]
    /// drops them without consuming capacity.
    pub fn cannot_insert(&self, indices: [u32; 3]) -> bool {
        if is_degenerate(indices) {
            return false;
        }

        let found = self.count_found(indices);

        self.num_vertices + 3 - found > self.max_vertex_size || self.num_prims + 1 > self.max_primitive_size
    }

    /// Bit-budget feasibility: like [PrimitiveCache::cannot_insert], but also
    /// accounts for the block bit budget.
    ///
    /// Accepting a vertex far from the cluster's first vertex widens the delta
    /// field for every vertex already held, so the prospective size is
    /// computed at the widened delta width, not the current one.
    pub fn cannot_insert_block(&self, indices: [u32; 3]) -> bool {
        if is_degenerate(indices) {
            return false;
        }

        let found = self.count_found(indices);

        // the `| 1` keeps find_msb defined when the delta is zero
        let first_vertex = if self.num_vertices > 0 { self.vertices[0] } else { indices[0] };
        let cmp_bits = indices
            .iter()
            .map(|&idx| find_msb((first_vertex ^ idx) | 1))
            .max()
            .unwrap()
            + 1;

        let delta_bits = cmp_bits.max(self.num_vertex_delta_bits);

        let new_vertices = self.num_vertices + 3 - found;
        let new_prims = self.num_prims + 1;
        let new_bits = self.block_bits(new_vertices, new_prims, delta_bits);

        new_prims > self.max_primitive_size || new_vertices > self.max_vertex_size || new_bits > self.max_block_bits
    }

    /// Accepts a triangle, assigning local indices to vertices not yet held.
    ///
    /// Degenerate triangles are silently dropped. Feasibility is not
    /// re-checked; calling this for a triangle that fails the matching
    /// predicate is a contract violation caught by debug assertions only.
    pub fn insert(&mut self, indices: [u32; 3]) {
        if is_degenerate(indices) {
            return;
        }

        let mut tri = [0u8; 3];

        for (i, &idx) in indices.iter().enumerate() {
            let found = self.vertices().iter().position(|&v| v == idx);

            match found {
                Some(local) => tri[i] = local as u8,
                None => {
                    if self.num_vertices > 0 {
                        self.num_vertex_delta_bits =
                            (find_msb((idx ^ self.vertices[0]) | 1) + 1).max(self.num_vertex_delta_bits);
                    }
                    self.num_vertex_all_bits = self.num_vertex_all_bits.max(find_msb(idx | 1) + 1);

                    self.vertices[self.num_vertices as usize] = idx;
                    tri[i] = self.num_vertices as u8;
                    self.num_vertices += 1;
                }
            }
        }

        self.primitives[self.num_prims as usize] = tri;
        self.num_prims += 1;

        debug_assert!(self.num_vertices <= self.max_vertex_size);
        debug_assert!(self.num_prims <= self.max_primitive_size);
        debug_assert!(self.fits_block());
    }
}
