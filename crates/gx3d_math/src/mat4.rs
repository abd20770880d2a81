//! 4x4 matrix helpers
//!
//! Matrices are stored column-major (`m[column][row]`), the same order in which
//! the container writes them.

use crate::Vec3;

/// 4x4 matrix type (column-major)
pub type Mat4 = [[f32; 4]; 4];

/// Identity matrix
pub const IDENTITY: Mat4 = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Translation matrix
pub fn from_translation(t: Vec3) -> Mat4 {
    let mut m = IDENTITY;
    m[3][0] = t.x;
    m[3][1] = t.y;
    m[3][2] = t.z;
    m
}

/// Multiply two 4x4 matrices: result = a * b
///
/// In column-major convention, this applies b first, then a.
#[allow(clippy::needless_range_loop)]
pub fn mul(a: Mat4, b: Mat4) -> Mat4 {
    let mut result = [[0.0f32; 4]; 4];

    for i in 0..4 {
        for j in 0..4 {
            for k in 0..4 {
                result[i][j] += a[k][j] * b[i][k];
            }
        }
    }

    result
}

/// Transform a point (w = 1)
pub fn transform_point(m: Mat4, p: Vec3) -> Vec3 {
    Vec3::new(
        m[0][0] * p.x + m[1][0] * p.y + m[2][0] * p.z + m[3][0],
        m[0][1] * p.x + m[1][1] * p.y + m[2][1] * p.z + m[3][1],
        m[0][2] * p.x + m[1][2] * p.y + m[2][2] * p.z + m[3][2],
    )
}

/// Transform a direction (w = 0)
pub fn transform_direction(m: Mat4, d: Vec3) -> Vec3 {
    Vec3::new(
        m[0][0] * d.x + m[1][0] * d.y + m[2][0] * d.z,
        m[0][1] * d.x + m[1][1] * d.y + m[2][1] * d.z,
        m[0][2] * d.x + m[1][2] * d.y + m[2][2] * d.z,
    )
}

/// Translation part of an affine matrix
pub fn translation(m: Mat4) -> Vec3 {
    Vec3::new(m[3][0], m[3][1], m[3][2])
}

/// Whether every element is within `epsilon` of the identity matrix
pub fn is_identity(m: Mat4, epsilon: f32) -> bool {
    (0..4).all(|c| (0..4).all(|r| (m[c][r] - IDENTITY[c][r]).abs() < epsilon))
}

/// Inverse of an affine matrix (last row `0 0 0 1`)
///
/// Returns `None` when the linear part is singular.
pub fn affine_inverse(m: Mat4) -> Option<Mat4> {
    let a = Vec3::new(m[0][0], m[0][1], m[0][2]);
    let b = Vec3::new(m[1][0], m[1][1], m[1][2]);
    let c = Vec3::new(m[2][0], m[2][1], m[2][2]);

    let det = a.dot(b.cross(c));
    if det.abs() < f32::EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;

    // Rows of the inverse linear part
    let r0 = b.cross(c) * inv_det;
    let r1 = c.cross(a) * inv_det;
    let r2 = a.cross(b) * inv_det;

    let t = translation(m);
    let inv_t = Vec3::new(-r0.dot(t), -r1.dot(t), -r2.dot(t));

    Some([
        [r0.x, r1.x, r2.x, 0.0],
        [r0.y, r1.y, r2.y, 0.0],
        [r0.z, r1.z, r2.z, 0.0],
        [inv_t.x, inv_t.y, inv_t.z, 1.0],
    ])
}

/// Rotation of an affine matrix as a unit quaternion `[x, y, z, w]`
///
/// Scale is removed from the basis columns before conversion.
pub fn to_quaternion(m: Mat4) -> [f32; 4] {
    let c0 = Vec3::new(m[0][0], m[0][1], m[0][2]).normalized();
    let c1 = Vec3::new(m[1][0], m[1][1], m[1][2]).normalized();
    let c2 = Vec3::new(m[2][0], m[2][1], m[2][2]).normalized();

    // r(row, col)
    let (r00, r10, r20) = (c0.x, c0.y, c0.z);
    let (r01, r11, r21) = (c1.x, c1.y, c1.z);
    let (r02, r12, r22) = (c2.x, c2.y, c2.z);

    let trace = r00 + r11 + r22;
    let q = if trace > 0.0 {
        let s = (trace + 1.0).sqrt() * 2.0;
        [(r21 - r12) / s, (r02 - r20) / s, (r10 - r01) / s, 0.25 * s]
    } else if r00 > r11 && r00 > r22 {
        let s = (1.0 + r00 - r11 - r22).sqrt() * 2.0;
        [0.25 * s, (r01 + r10) / s, (r02 + r20) / s, (r21 - r12) / s]
    } else if r11 > r22 {
        let s = (1.0 + r11 - r00 - r22).sqrt() * 2.0;
        [(r01 + r10) / s, 0.25 * s, (r12 + r21) / s, (r02 - r20) / s]
    } else {
        let s = (1.0 + r22 - r00 - r11).sqrt() * 2.0;
        [(r02 + r20) / s, (r12 + r21) / s, 0.25 * s, (r10 - r01) / s]
    };

    let len = q.iter().map(|v| v * v).sum::<f32>().sqrt();
    if len > 0.0 {
        [q[0] / len, q[1] / len, q[2] / len, q[3] / len]
    } else {
        [0.0, 0.0, 0.0, 1.0]
    }
}
