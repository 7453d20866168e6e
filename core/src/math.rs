//! Math type aliases and transform helpers.
//!
//! Rotations are stored on transforms as XYZ Euler angles in radians. The
//! rotation matrix they describe is `Rz * Ry * Rx`, which is also what
//! [`quat_from_euler`] builds.

pub use nalgebra;

/// 2D vector (f32).
pub type Vec2 = nalgebra::Vector2<f32>;

/// 3D vector (f32).
pub type Vec3 = nalgebra::Vector3<f32>;

/// 4D vector (f32).
pub type Vec4 = nalgebra::Vector4<f32>;

/// 4x4 matrix (f32), column-major.
pub type Mat4 = nalgebra::Matrix4<f32>;

/// Unit quaternion (f32).
pub type Quat = nalgebra::UnitQuaternion<f32>;

/// Below this magnitude a homogeneous `w` or an axis length counts as zero.
const DEGENERATE_EPSILON: f32 = 1e-6;

/// `|sin(pitch)|` above `1 - GIMBAL_EPSILON` is treated as gimbal lock.
const GIMBAL_EPSILON: f32 = 1e-6;

// ===== Rotation helpers =====

/// Builds a rotation from XYZ Euler angles (radians).
pub fn quat_from_euler(euler: Vec3) -> Quat {
    Quat::from_euler_angles(euler.x, euler.y, euler.z)
}

/// Extracts XYZ Euler angles (radians) from a rotation.
pub fn euler_from_quat(q: &Quat) -> Vec3 {
    let (x, y, z) = q.euler_angles();
    Vec3::new(x, y, z)
}

/// Rotates `v` by `q`.
pub fn quat_rotate_vec3(q: &Quat, v: Vec3) -> Vec3 {
    q.transform_vector(&v)
}

/// Builds a rotation from raw quaternion components, normalizing them.
pub fn quat_from_xyzw(x: f32, y: f32, z: f32, w: f32) -> Quat {
    Quat::from_quaternion(nalgebra::Quaternion::new(w, x, y, z))
}

/// Rotation axis scaled by the angle in radians.
pub fn quat_to_scaled_axis(q: &Quat) -> Vec3 {
    q.scaled_axis()
}

// ===== Matrix composition =====

/// Build a 4x4 matrix from a translation.
pub fn mat4_from_translation(t: Vec3) -> Mat4 {
    Mat4::new_translation(&t)
}

/// Build `T * R * S` from translation, XYZ Euler rotation and scale.
pub fn compose_transform(translation: Vec3, rotation: Vec3, scale: Vec3) -> Mat4 {
    let r = quat_from_euler(rotation).to_rotation_matrix();
    let rm = r.matrix();
    #[rustfmt::skip]
    let result = Mat4::new(
        rm[(0, 0)] * scale.x, rm[(0, 1)] * scale.y, rm[(0, 2)] * scale.z, translation.x,
        rm[(1, 0)] * scale.x, rm[(1, 1)] * scale.y, rm[(1, 2)] * scale.z, translation.y,
        rm[(2, 0)] * scale.x, rm[(2, 1)] * scale.y, rm[(2, 2)] * scale.z, translation.z,
        0.0,                  0.0,                  0.0,                  1.0,
    );
    result
}

/// Right-handed perspective projection with depth range [0, 1].
pub fn perspective_rh(yfov: f32, aspect: f32, znear: f32, zfar: f32) -> Mat4 {
    let f = 1.0 / (yfov / 2.0).tan();
    let nf = 1.0 / (znear - zfar);
    #[rustfmt::skip]
    let result = Mat4::new(
        f / aspect, 0.0,  0.0,              0.0,
        0.0,        f,    0.0,              0.0,
        0.0,        0.0,  zfar * nf,        znear * zfar * nf,
        0.0,        0.0,  -1.0,             0.0,
    );
    result
}

/// Right-handed orthographic projection with depth range [0, 1].
pub fn orthographic_rh(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    let rml = right - left;
    let tmb = top - bottom;
    let fmn = far - near;
    #[rustfmt::skip]
    let result = Mat4::new(
        2.0 / rml, 0.0,       0.0,         -(right + left) / rml,
        0.0,       2.0 / tmb, 0.0,         -(top + bottom) / tmb,
        0.0,       0.0,       -1.0 / fmn,  -near / fmn,
        0.0,       0.0,       0.0,          1.0,
    );
    result
}

/// Splits an affine matrix into translation, XYZ Euler rotation and scale.
///
/// Any perspective part is discarded. Returns `None` when the homogeneous
/// `w` is zero or an axis has collapsed to zero length; callers keep their
/// previous pose in that case.
///
/// When the pitch sits at +-90 degrees the yaw/roll split is not unique; the
/// whole rotation is then folded into the X angle and Z is reported as 0.
pub fn decompose_transform(m: &Mat4) -> Option<(Vec3, Vec3, Vec3)> {
    let w = m[(3, 3)];
    if w.abs() < DEGENERATE_EPSILON {
        return None;
    }
    let m = *m / w;

    let translation = Vec3::new(m[(0, 3)], m[(1, 3)], m[(2, 3)]);

    // Basis vectors are the columns of the upper 3x3.
    let mut axes = [
        Vec3::new(m[(0, 0)], m[(1, 0)], m[(2, 0)]),
        Vec3::new(m[(0, 1)], m[(1, 1)], m[(2, 1)]),
        Vec3::new(m[(0, 2)], m[(1, 2)], m[(2, 2)]),
    ];

    let mut scale = Vec3::zeros();
    for (i, axis) in axes.iter_mut().enumerate() {
        let len = axis.norm();
        if len < DEGENERATE_EPSILON {
            return None;
        }
        scale[i] = len;
        *axis /= len;
    }

    // Mirrored bases keep their handedness in the scale.
    if axes[0].dot(&axes[1].cross(&axes[2])) < 0.0 {
        scale = -scale;
        for axis in axes.iter_mut() {
            *axis = -*axis;
        }
    }

    // Basis columns of Rz * Ry * Rx: x = (cy*cz, cy*sz, -sy), and the z
    // components of the y and z columns are (cy*sx, cy*cx).
    let sin_pitch = (-axes[0].z).clamp(-1.0, 1.0);
    let mut rotation = Vec3::zeros();
    if sin_pitch.abs() < 1.0 - GIMBAL_EPSILON {
        rotation.y = sin_pitch.asin();
        rotation.x = axes[1].z.atan2(axes[2].z);
        rotation.z = axes[0].y.atan2(axes[0].x);
    } else {
        let sign = sin_pitch.signum();
        rotation.y = sign * std::f32::consts::FRAC_PI_2;
        rotation.x = (sign * axes[1].x).atan2(axes[1].y);
        rotation.z = 0.0;
    }

    Some((translation, rotation, scale))
}

/// Transforms a point (w = 1) by an affine matrix.
pub fn transform_point(m: &Mat4, p: Vec3) -> Vec3 {
    m.transform_point(&nalgebra::Point3::from(p)).coords
}

/// Transforms a direction (w = 0) by an affine matrix.
pub fn transform_vector(m: &Mat4, v: Vec3) -> Vec3 {
    m.transform_vector(&v)
}

/// Right-handed view matrix looking from `eye` at `target`.
pub fn look_at_rh(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
    Mat4::look_at_rh(
        &nalgebra::Point3::from(eye),
        &nalgebra::Point3::from(target),
        &up,
    )
}

// ===== Polygons =====

/// Triangulates a simple polygon by ear clipping.
///
/// Accepts either winding and returns index triples into `points`, wound
/// counter-clockwise. Fewer than three points produce no triangles.
pub fn triangulate_polygon(points: &[Vec2]) -> Vec<[usize; 3]> {
    let n = points.len();
    if n < 3 {
        return Vec::new();
    }

    let signed_area: f32 = (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum();

    let mut remaining: Vec<usize> = if signed_area >= 0.0 {
        (0..n).collect()
    } else {
        (0..n).rev().collect()
    };

    let cross = |o: Vec2, a: Vec2, b: Vec2| (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x);
    let inside = |p: Vec2, a: Vec2, b: Vec2, c: Vec2| {
        cross(a, b, p) >= 0.0 && cross(b, c, p) >= 0.0 && cross(c, a, p) >= 0.0
    };

    let mut triangles = Vec::with_capacity(n - 2);
    let mut guard = 0;
    while remaining.len() > 3 && guard < remaining.len() {
        let len = remaining.len();
        let mut clipped = false;
        for i in 0..len {
            let ia = remaining[(i + len - 1) % len];
            let ib = remaining[i];
            let ic = remaining[(i + 1) % len];
            let (a, b, c) = (points[ia], points[ib], points[ic]);

            if cross(a, b, c) <= 0.0 {
                continue;
            }
            let blocked = remaining
                .iter()
                .filter(|&&j| j != ia && j != ib && j != ic)
                .any(|&j| inside(points[j], a, b, c));
            if blocked {
                continue;
            }

            triangles.push([ia, ib, ic]);
            remaining.remove(i);
            clipped = true;
            break;
        }
        if clipped {
            guard = 0;
        } else {
            // Collinear or self-touching input; drop a vertex and keep going.
            log::warn!("triangulate_polygon: no ear found, dropping a vertex");
            remaining.remove(0);
            guard += 1;
        }
    }

    if remaining.len() == 3 {
        let (a, b, c) = (remaining[0], remaining[1], remaining[2]);
        if cross(points[a], points[b], points[c]).abs() > f32::EPSILON {
            triangles.push([a, b, c]);
        }
    }

    triangles
}
