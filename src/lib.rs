//! meshlet-pack
//!
//! Converts indexed triangle meshes into fixed-capacity clusters ("meshlets")
//! for GPU cluster-culling and cluster-rasterization pipelines. The core is a
//! greedy primitive cache that tracks, per candidate triangle, whether the
//! in-progress meshlet would still fit its vertex limit, primitive limit and
//! optional encoded bit budget, where admitting a far-away vertex retroactively
//! widens the delta field of every vertex already accepted.
//!
//! [builder::pack_meshlets] drives the cache over an index stream and emits
//! the descriptor, vertex index and bit-packed primitive buffers a cluster
//! renderer consumes, plus optional per-meshlet bounding boxes and
//! octahedral-encoded orientations for culling.

#![allow(clippy::identity_op)]

pub mod bitfield;
pub mod builder;
pub mod cache;
pub mod octahedral;
pub mod quantize;
pub mod stats;
pub mod vector;

/// Hard ceiling on distinct vertices per meshlet, fixed by the 8-bit local
/// index encoding of the packed primitive buffer.
pub const MAX_VERTEX_COUNT_LIMIT: usize = 256;

/// Hard ceiling on triangles per meshlet.
pub const MAX_PRIMITIVE_COUNT_LIMIT: usize = 256;

/// Vertex position access for bounding box and orientation computation.
pub trait Position {
    fn pos(&self) -> [f32; 3];
}

/// Packing limits for meshlet construction.
///
/// The hard `MAX_*_COUNT_LIMIT` ceilings exist because of the descriptor
/// encoding; actual hardware limits can be higher but large on-chip
/// allocations typically make things slower, so smaller configured maxima are
/// recommended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PackingConfig {
    /// Distinct vertices allowed per meshlet, at most [MAX_VERTEX_COUNT_LIMIT].
    pub max_vertex_size: u32,
    /// Triangles allowed per meshlet, at most [MAX_PRIMITIVE_COUNT_LIMIT].
    pub max_primitive_size: u32,
    /// Bit width of one local vertex reference inside a packed triangle;
    /// `2^primitive_bits` must cover `max_vertex_size`.
    pub primitive_bits: u32,
    /// Total bit budget for a meshlet's delta-coded vertex and packed
    /// primitive data. `None` selects capacity-only admission.
    pub max_block_bits: Option<u32>,
}

impl Default for PackingConfig {
    fn default() -> Self {
        Self {
            max_vertex_size: 64,
            max_primitive_size: 126,
            primitive_bits: 8,
            max_block_bits: None,
        }
    }
}
