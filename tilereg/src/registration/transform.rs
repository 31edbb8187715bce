//! 2D affine transform between a moving round and the fixed round.

use glam::{DAffine2, DMat2, DVec2};

/// Determinant magnitude below which the linear part counts as singular.
const MIN_DETERMINANT: f64 = 1e-10;

/// Affine map from MOVING coordinates to FIXED coordinates.
///
/// Stored as a linear part plus translation:
/// ```text
/// | a  b  tx |
/// | c  d  ty |
/// | 0  0  1  |
/// ```
/// Points are `DVec2 { x: column, y: row }`.
///
/// Given the transform estimated for a round:
/// - `T.apply(moving_point)` gives the corresponding fixed point
/// - `T.inverse().apply(fixed_point)` gives the moving point to sample when
///   resampling the moving image onto the fixed grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    affine: DAffine2,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl std::fmt::Display for Transform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let t = self.translation_components();
        write!(
            f,
            "Affine(dx={:.2}, dy={:.2}, rot={:.3}°, scale={:.4})",
            t.x,
            t.y,
            self.rotation_angle().to_degrees(),
            self.scale_factor()
        )
    }
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            affine: DAffine2::IDENTITY,
        }
    }

    pub fn translation(t: DVec2) -> Self {
        Self {
            affine: DAffine2::from_translation(t),
        }
    }

    /// Translation + rotation + uniform scale.
    pub fn similarity(t: DVec2, angle: f64, scale: f64) -> Self {
        Self {
            affine: DAffine2::from_scale_angle_translation(DVec2::splat(scale), angle, t),
        }
    }

    /// Create from 6 row-major parameters `[a, b, tx, c, d, ty]`.
    pub fn affine(params: [f64; 6]) -> Self {
        let [a, b, tx, c, d, ty] = params;
        Self {
            affine: DAffine2::from_mat2_translation(
                DMat2::from_cols(DVec2::new(a, c), DVec2::new(b, d)),
                DVec2::new(tx, ty),
            ),
        }
    }

    /// Row-major parameters `[a, b, tx, c, d, ty]`.
    pub fn params(&self) -> [f64; 6] {
        let m = self.affine.matrix2;
        let t = self.affine.translation;
        [m.x_axis.x, m.y_axis.x, t.x, m.x_axis.y, m.y_axis.y, t.y]
    }

    /// Map a moving-space point into fixed space.
    #[inline]
    pub fn apply(&self, p: DVec2) -> DVec2 {
        self.affine.transform_point2(p)
    }

    /// Inverse map (fixed → moving).
    ///
    /// Only meaningful for transforms where [`is_valid`](Self::is_valid) holds;
    /// a singular transform yields non-finite coefficients.
    pub fn inverse(&self) -> Self {
        Self {
            affine: self.affine.inverse(),
        }
    }

    /// Compose two transforms: `self * other` (apply `other` first).
    pub fn compose(&self, other: &Self) -> Self {
        Self {
            affine: self.affine * other.affine,
        }
    }

    pub fn translation_components(&self) -> DVec2 {
        self.affine.translation
    }

    /// Rotation angle in radians of the first column (exact for similarity transforms).
    pub fn rotation_angle(&self) -> f64 {
        let col = self.affine.matrix2.x_axis;
        col.y.atan2(col.x)
    }

    /// Length of the first column (exact for similarity transforms).
    pub fn scale_factor(&self) -> f64 {
        self.affine.matrix2.x_axis.length()
    }

    pub fn determinant(&self) -> f64 {
        self.affine.matrix2.determinant()
    }

    /// Non-degenerate, finite transform.
    pub fn is_valid(&self) -> bool {
        let det = self.determinant();
        det.abs() > MIN_DETERMINANT && det.is_finite() && self.affine.translation.is_finite()
    }

    /// Euclidean distance between `apply(moving)` and `fixed`.
    #[inline]
    pub fn residual(&self, moving: DVec2, fixed: DVec2) -> f64 {
        self.apply(moving).distance(fixed)
    }
}
