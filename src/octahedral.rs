//! Octahedral encoding of unit vectors into two bounded components
//!
//! Derived from "A Survey of Efficient Representations for Independent Unit Vectors",
//! <http://jcgt.org/published/0003/02/01/paper.pdf>

use crate::vector::Vec3;

/// Returns +/- 1 per component, leaving z as is.
fn sign_not_zero(v: Vec3) -> Vec3 {
    Vec3::new(
        if v.x >= 0.0 { 1.0 } else { -1.0 },
        if v.y >= 0.0 { 1.0 } else { -1.0 },
        1.0,
    )
}

/// Projects a normalized vector onto the octahedron and folds the lower
/// hemisphere over the diagonals.
///
/// Output x/y are in [-1, 1], z is zero.
pub fn to_oct(v: Vec3) -> Vec3 {
    // project the sphere onto the octahedron, and then onto the xy plane
    let p = Vec3::new(v.x, v.y, 0.0) * (1.0 / (v.x.abs() + v.y.abs() + v.z.abs()));

    if v.z <= 0.0 {
        Vec3::new(1.0 - p.y.abs(), 1.0 - p.x.abs(), 0.0) * sign_not_zero(p)
    } else {
        p
    }
}

/// Reconstructs the unit vector from its octahedral encoding, the inverse of
/// [to_oct].
pub fn from_oct(e: Vec3) -> Vec3 {
    let v = Vec3::new(e.x, e.y, 1.0 - e.x.abs() - e.y.abs());

    let v = if v.z < 0.0 {
        Vec3::new(1.0 - v.y.abs(), 1.0 - v.x.abs(), v.z) * sign_not_zero(v)
    } else {
        v
    };

    v.normalize()
}

/// Octahedral encoding quantized to `n/2`-bit snorm precision per axis.
///
/// Independent per-axis rounding does not minimize angular error jointly, so
/// all four floor/ceil combinations of the two axes are tried and the one
/// whose decoded vector has the highest cosine similarity with `v` wins.
/// `n` must be even and at least 4.
pub fn to_oct_precise(v: Vec3, n: u32) -> Vec3 {
    assert!(n % 2 == 0 && n >= 4);

    // each snorm's max value interpreted as an integer, e.g. 127.0 for snorm8
    let m = ((1 << (n / 2 - 1)) - 1) as f32;

    // remap components to snorm(n/2) precision, with floor instead of round
    let s = (to_oct(v).clamp(-1.0, 1.0) * m).floor() * (1.0 / m);

    let mut best = s;
    let mut highest_cosine = from_oct(s).dot(v);

    // test all remaining floor/ceil combinations and keep the best; at +/- 1
    // a candidate exits the square but decodes worse and never wins
    for i in 0..=1 {
        for j in 0..=1 {
            if i != 0 || j != 0 {
                let candidate = Vec3::new(i as f32, j as f32, 0.0) * (1.0 / m) + s;
                let cosine = from_oct(candidate).dot(v);

                if cosine > highest_cosine {
                    best = candidate;
                    highest_cosine = cosine;
                }
            }
        }
    }

    best
}
