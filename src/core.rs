use crate::error::{KinemaError, KinemaResult};

pub use kurbo::{Point, Vec2};

/// Clamp scalar value to normalized range `[0, 1]`.
#[inline]
pub fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

/// A grid-mesh vertex. Warps displace `z` out of the node plane; the render
/// backend decides how to project it.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn xy(self) -> Point {
        Point::new(self.x, self.y)
    }
}

impl std::ops::Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl std::ops::Mul<f64> for Vec3 {
    type Output = Self;
    fn mul(self, k: f64) -> Self {
        Self::new(self.x * k, self.y * k, self.z * k)
    }
}

/// Cell dimensions of a deformation grid: `cols x rows` cells.
///
/// A mesh grid holds `(cols + 1) * (rows + 1)` shared vertices; a tiled grid
/// holds `cols * rows` independent quads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GridSize {
    pub cols: u32,
    pub rows: u32,
}

impl GridSize {
    pub fn new(cols: u32, rows: u32) -> KinemaResult<Self> {
        if cols == 0 || rows == 0 {
            return Err(KinemaError::config("grid size must be at least 1x1"));
        }
        Ok(Self { cols, rows })
    }

    pub fn cell_count(self) -> usize {
        (self.cols as usize) * (self.rows as usize)
    }

    pub fn vertex_count(self) -> usize {
        ((self.cols + 1) as usize) * ((self.rows + 1) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_size_rejects_zero_axis() {
        assert!(GridSize::new(0, 4).is_err());
        assert!(GridSize::new(4, 0).is_err());
        assert!(GridSize::new(1, 1).is_ok());
    }

    #[test]
    fn grid_size_counts() {
        let g = GridSize::new(4, 3).unwrap();
        assert_eq!(g.cell_count(), 12);
        assert_eq!(g.vertex_count(), 20);
    }

    #[test]
    fn vec3_arithmetic() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(0.5, -2.0, 1.0);
        assert_eq!(a + b, Vec3::new(1.5, 0.0, 4.0));
        assert_eq!(a - b, Vec3::new(0.5, 4.0, 2.0));
        assert_eq!(a * 2.0, Vec3::new(2.0, 4.0, 6.0));
    }

    #[test]
    fn clamp01_bounds() {
        assert_eq!(clamp01(-0.5), 0.0);
        assert_eq!(clamp01(0.25), 0.25);
        assert_eq!(clamp01(1.5), 1.0);
    }
}
