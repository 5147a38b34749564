//! Minimal 3D vector algebra and quantized vectors

use std::ops::{Add, Div, Mul, Sub};

/// Plain 3-component float vector.
///
/// Deliberately minimal; only the operations the packing core needs.
#[derive(Clone, Copy, Default, Debug, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub const fn splat(v: f32) -> Self {
        Self { x: v, y: v, z: v }
    }

    pub fn from_array(v: [f32; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    pub fn min(self, other: Self) -> Self {
        Self::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    pub fn max(self, other: Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }

    pub fn floor(self) -> Self {
        Self::new(self.x.floor(), self.y.floor(), self.z.floor())
    }

    pub fn clamp(self, lower: f32, upper: f32) -> Self {
        Self::new(
            self.x.clamp(lower, upper),
            self.y.clamp(lower, upper),
            self.z.clamp(lower, upper),
        )
    }

    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Returns the unit vector pointing in the same direction.
    ///
    /// The input length must be non-zero; a zero vector produces NaN components.
    pub fn normalize(self) -> Self {
        self * (1.0 / self.length())
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl Mul for Vec3 {
    type Output = Vec3;

    fn mul(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x * other.x, self.y * other.y, self.z * other.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;

    fn mul(self, other: f32) -> Vec3 {
        Vec3::new(self.x * other, self.y * other, self.z * other)
    }
}

impl Div for Vec3 {
    type Output = Vec3;

    fn div(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x / other.x, self.y / other.y, self.z / other.z)
    }
}

/// Position quantized into an integer lattice, one unsigned value per axis.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct QVec3 {
    pub bits: [u32; 3],
}

impl QVec3 {
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { bits: [x, y, z] }
    }

    pub const fn splat(raw: u32) -> Self {
        Self { bits: [raw, raw, raw] }
    }

    /// Quantizes `v` into `[0, mul]` per axis, round-to-nearest.
    ///
    /// `mul` is typically `2^n - 1` for an n-bit lattice. All components of
    /// `bbox_extent` must be non-zero; zero-extent axes are the caller's
    /// responsibility to special-case.
    pub fn quantize(v: Vec3, bbox_min: Vec3, bbox_extent: Vec3, mul: f32) -> Self {
        let nrm = (v - bbox_min) / bbox_extent;

        Self {
            bits: [
                (nrm.x * mul).round() as u32,
                (nrm.y * mul).round() as u32,
                (nrm.z * mul).round() as u32,
            ],
        }
    }

    pub fn min(self, other: Self) -> Self {
        Self {
            bits: [
                self.bits[0].min(other.bits[0]),
                self.bits[1].min(other.bits[1]),
                self.bits[2].min(other.bits[2]),
            ],
        }
    }

    pub fn max(self, other: Self) -> Self {
        Self {
            bits: [
                self.bits[0].max(other.bits[0]),
                self.bits[1].max(other.bits[1]),
                self.bits[2].max(other.bits[2]),
            ],
        }
    }
}

impl Sub for QVec3 {
    type Output = QVec3;

    fn sub(self, other: QVec3) -> QVec3 {
        QVec3 {
            bits: [
                self.bits[0].wrapping_sub(other.bits[0]),
                self.bits[1].wrapping_sub(other.bits[1]),
                self.bits[2].wrapping_sub(other.bits[2]),
            ],
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_vec_ops() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, -1.0, 0.5);

        assert_eq!(a + b, Vec3::new(5.0, 1.0, 3.5));
        assert_eq!(a - b, Vec3::new(-3.0, 3.0, 2.5));
        assert_eq!(a.min(b), Vec3::new(1.0, -1.0, 0.5));
        assert_eq!(a.max(b), Vec3::new(4.0, 2.0, 3.0));
        assert_eq!(a.dot(b), 3.5);
    }

    #[test]
    fn test_cross_orthogonal() {
        let x = Vec3::new(1.0, 0.0, 0.0);
        let y = Vec3::new(0.0, 1.0, 0.0);

        assert_eq!(x.cross(y), Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_normalize() {
        let v = Vec3::new(3.0, 0.0, 4.0).normalize();

        assert!((v.length() - 1.0).abs() < 1e-6);
        assert!((v.x - 0.6).abs() < 1e-6 && (v.z - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_quantize_round_trip_corners() {
        let bbox_min = Vec3::splat(-1.0);
        let bbox_extent = Vec3::splat(2.0);
        let mul = 1023.0;

        let lo = QVec3::quantize(bbox_min, bbox_min, bbox_extent, mul);
        let hi = QVec3::quantize(Vec3::splat(1.0), bbox_min, bbox_extent, mul);

        assert_eq!(lo, QVec3::splat(0));
        assert_eq!(hi, QVec3::splat(1023));
        assert_eq!(hi - lo, QVec3::splat(1023));
        assert_eq!(lo.min(hi), lo);
        assert_eq!(lo.max(hi), hi);
    }

    #[test]
    fn test_quantize_rounds_to_nearest() {
        let bbox_min = Vec3::splat(0.0);
        let bbox_extent = Vec3::splat(1.0);

        let q = QVec3::quantize(Vec3::splat(0.5), bbox_min, bbox_extent, 255.0);

        // 0.5 * 255 = 127.5, rounds away from zero
        assert_eq!(q, QVec3::splat(128));
    }
}
