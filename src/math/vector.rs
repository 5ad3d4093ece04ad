//! Magnetic-field vector and the rotation into the field-aligned frame.
//!
//! The field-aligned frame has +z along the field. The rotation is built with
//! the Euler–Rodrigues formula: with `φ = arccos(B_z / |B|)` and the axis
//! `n = ẑ × B / |ẑ × B|`, rotating `B` by `-φ` about `n` lands it on +z.
//!
//! Degenerate cases:
//! - `B` parallel to +z: the cross product vanishes and the rotation is the identity.
//! - `B` anti-parallel to +z: the axis is undefined; we rotate by π about +x.
//! - `|B| = 0`: rejected at construction.

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Cross-product magnitude (relative to |B|) below which `B` is treated as lying on the z-axis.
const AXIS_EPS: f64 = 1e-15;

/// A single non-zero, finite 3D field vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 3]", into = "[f64; 3]")]
pub struct FieldVector {
    vec: Vector3<f64>,
}

impl FieldVector {
    pub fn new(components: [f64; 3]) -> Result<Self, AppError> {
        let vec = Vector3::from(components);
        if vec.iter().any(|c| !c.is_finite()) {
            return Err(AppError::missing_data(format!(
                "Field vector has non-finite components: {components:?}"
            )));
        }
        if vec.norm() == 0.0 {
            return Err(AppError::missing_data("Field vector has zero length."));
        }
        Ok(Self { vec })
    }

    pub fn components(&self) -> [f64; 3] {
        [self.vec.x, self.vec.y, self.vec.z]
    }

    pub fn as_vector(&self) -> &Vector3<f64> {
        &self.vec
    }

    pub fn magnitude(&self) -> f64 {
        self.vec.norm()
    }

    /// The 3×3 rotation matrix that maps this vector onto the +z axis.
    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        let norm = self.vec.norm();
        let orth = Vector3::z().cross(&self.vec);

        if orth.norm() <= AXIS_EPS * norm {
            return if self.vec.z >= 0.0 {
                Matrix3::identity()
            } else {
                rotation_about_axis(&Vector3::x(), std::f64::consts::PI)
            };
        }

        let phi = (self.vec.z / norm).clamp(-1.0, 1.0).acos();
        rotation_about_axis(&orth, -phi)
    }
}

impl TryFrom<[f64; 3]> for FieldVector {
    type Error = AppError;

    fn try_from(value: [f64; 3]) -> Result<Self, Self::Error> {
        FieldVector::new(value)
    }
}

impl From<FieldVector> for [f64; 3] {
    fn from(value: FieldVector) -> Self {
        value.components()
    }
}

/// Counter-clockwise rotation by `theta` (radians) about `axis` (Euler–Rodrigues).
///
/// `axis` need not be normalised but must be non-zero.
pub fn rotation_about_axis(axis: &Vector3<f64>, theta: f64) -> Matrix3<f64> {
    let n = axis / axis.norm();

    let a = (theta / 2.0).cos();
    let s = (theta / 2.0).sin();
    let (b, c, d) = (n.x * s, n.y * s, n.z * s);
    let (aa, bb, cc, dd) = (a * a, b * b, c * c, d * d);
    let (bc, ad, ac, ab, bd, cd) = (b * c, a * d, a * c, a * b, b * d, c * d);

    Matrix3::new(
        aa + bb - cc - dd,
        2.0 * (bc - ad),
        2.0 * (bd + ac),
        2.0 * (bc + ad),
        aa + cc - bb - dd,
        2.0 * (cd - ab),
        2.0 * (bd - ac),
        2.0 * (cd + ab),
        aa + dd - bb - cc,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn sample_vectors() -> Vec<[f64; 3]> {
        vec![
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [0.0, 0.0, -1.0],
            [1.0, 1.0, 1.0],
            [-3.0, 4.0, 0.5],
            [12.0, -7.5, -30.0],
            [1e-3, 2e-3, -5e-4],
            [0.3, -0.2, 0.93],
        ]
    }

    #[test]
    fn rotation_maps_vector_onto_z_axis() {
        for c in sample_vectors() {
            let b = FieldVector::new(c).unwrap();
            let r = b.rotation_matrix();
            let rotated = r * b.as_vector();
            let mag = b.magnitude();
            assert_abs_diff_eq!(rotated.x, 0.0, epsilon = 1e-9 * mag);
            assert_abs_diff_eq!(rotated.y, 0.0, epsilon = 1e-9 * mag);
            assert_relative_eq!(rotated.z, mag, max_relative = 1e-9);
        }
    }

    #[test]
    fn rotation_is_orthonormal() {
        for c in sample_vectors() {
            let r = FieldVector::new(c).unwrap().rotation_matrix();
            assert_relative_eq!(r.transpose() * r, Matrix3::identity(), epsilon = 1e-12);
            assert_relative_eq!(r.determinant(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn transpose_undoes_rotation() {
        let r = FieldVector::new([2.0, -1.0, 0.3]).unwrap().rotation_matrix();
        let v = Vector3::new(412.0, -35.5, 18.25);
        let back = r.transpose() * (r * v);
        assert_relative_eq!(back, v, epsilon = 1e-9);
    }

    #[test]
    fn aligned_field_gives_identity() {
        let r = FieldVector::new([0.0, 0.0, 5.0]).unwrap().rotation_matrix();
        assert_eq!(r, Matrix3::identity());
    }

    #[test]
    fn anti_aligned_field_flips_onto_z() {
        let b = FieldVector::new([0.0, 0.0, -2.0]).unwrap();
        let rotated = b.rotation_matrix() * b.as_vector();
        assert_relative_eq!(rotated, Vector3::new(0.0, 0.0, 2.0), epsilon = 1e-12);
    }

    #[test]
    fn zero_or_non_finite_vector_is_rejected() {
        assert!(FieldVector::new([0.0, 0.0, 0.0]).is_err());
        assert!(FieldVector::new([f64::NAN, 1.0, 0.0]).is_err());
        assert!(FieldVector::new([1.0, f64::INFINITY, 0.0]).is_err());
    }

    #[test]
    fn rodrigues_quarter_turn_about_z() {
        let r = rotation_about_axis(&Vector3::z(), std::f64::consts::FRAC_PI_2);
        let v = r * Vector3::x();
        assert_relative_eq!(v, Vector3::y(), epsilon = 1e-12);
    }

    #[test]
    fn deserialising_zero_vector_fails() {
        let ok: FieldVector = serde_json::from_str("[1.0, 2.0, 3.0]").unwrap();
        assert_eq!(ok.components(), [1.0, 2.0, 3.0]);
        assert!(serde_json::from_str::<FieldVector>("[0.0, 0.0, 0.0]").is_err());
    }
}
