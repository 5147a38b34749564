//! Packing efficiency statistics

use std::fmt;

/// Per-run packing counters, filled once per finalized meshlet.
///
/// Load averages and variances are carried as partial moment sums so that
/// stats from independently processed partitions can be merged with
/// [Stats::append]; nothing is normalized until [Stats::report].
#[derive(Clone, Copy, Default, Debug)]
pub struct Stats {
    /// Number of finalized meshlets.
    pub meshlets_total: usize,

    /// Primitive index slots allocated, including word-alignment padding.
    pub prim_indices: usize,
    /// Triangles actually packed.
    pub prim_total: usize,

    /// Vertex index slots allocated.
    pub vertex_indices: usize,
    /// Distinct vertices actually referenced.
    pub vertex_total: usize,

    /// Sum over meshlets of `triangle_count / max_primitive_size`.
    pub primload_sum: f64,
    /// Sum of squares of the same ratio.
    pub primload_sq_sum: f64,
    /// Sum over meshlets of `vertex_count / max_vertex_size`.
    pub vertexload_sum: f64,
    /// Sum of squares of the same ratio.
    pub vertexload_sq_sum: f64,
}

impl Stats {
    /// Merges `other` into `self` by field-wise summation.
    ///
    /// Commutative and associative; the merged value is not reportable until
    /// normalized by [Stats::report].
    pub fn append(&mut self, other: &Stats) {
        self.meshlets_total += other.meshlets_total;

        self.prim_indices += other.prim_indices;
        self.prim_total += other.prim_total;
        self.vertex_indices += other.vertex_indices;
        self.vertex_total += other.vertex_total;

        self.primload_sum += other.primload_sum;
        self.primload_sq_sum += other.primload_sq_sum;
        self.vertexload_sum += other.vertexload_sum;
        self.vertexload_sq_sum += other.vertexload_sq_sum;
    }

    /// Normalizes the accumulated moments into a reportable summary.
    ///
    /// Must not be called before at least one meshlet has been recorded.
    pub fn report(&self) -> StatsReport {
        assert!(self.meshlets_total > 0);

        let n = self.meshlets_total as f64;

        let primload_avg = self.primload_sum / n;
        let vertexload_avg = self.vertexload_sum / n;

        StatsReport {
            meshlets_total: self.meshlets_total,
            prim_total: self.prim_total,
            vertex_total: self.vertex_total,
            primload_avg,
            primload_var: self.primload_sq_sum / n - primload_avg * primload_avg,
            vertexload_avg,
            vertexload_var: self.vertexload_sq_sum / n - vertexload_avg * vertexload_avg,
            prim_waste: self.prim_indices as f64 / (self.prim_total * 3) as f64 - 1.0,
            vertex_waste: self.vertex_indices as f64 / self.vertex_total as f64 - 1.0,
        }
    }
}

/// Normalized per-run summary produced by [Stats::report].
#[derive(Clone, Copy, Debug)]
pub struct StatsReport {
    pub meshlets_total: usize,
    pub prim_total: usize,
    pub vertex_total: usize,
    /// Mean fill ratio of the primitive limit.
    pub primload_avg: f64,
    pub primload_var: f64,
    /// Mean fill ratio of the vertex limit.
    pub vertexload_avg: f64,
    pub vertexload_var: f64,
    /// Allocated-over-used primitive index slots, minus one.
    pub prim_waste: f64,
    /// Allocated-over-used vertex index slots, minus one.
    pub vertex_waste: f64,
}

impl fmt::Display for StatsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "meshlets; {}; prim; {}; {:.2}; vertex; {}; {:.2}; waste; v; {:.2}; p; {:.2};",
            self.meshlets_total,
            self.prim_total,
            self.primload_avg,
            self.vertex_total,
            self.vertexload_avg,
            self.vertex_waste,
            self.prim_waste,
        )
    }
}
