use glam::{Mat4, Vec3, Vec4};
use super::*;

/// Axis-aligned box [-h, h]^3 expressed as six inward planes.
fn box_frustum(h: f32) -> Frustum {
    Frustum::from_planes(
        [
            Vec4::new(1.0, 0.0, 0.0, h),
            Vec4::new(-1.0, 0.0, 0.0, h),
            Vec4::new(0.0, 1.0, 0.0, h),
            Vec4::new(0.0, -1.0, 0.0, h),
            Vec4::new(0.0, 0.0, 1.0, h),
            Vec4::new(0.0, 0.0, -1.0, h),
        ],
        Vec3::ZERO,
    )
}

fn perspective_frustum() -> Frustum {
    let projection = Mat4::perspective_rh(
        std::f32::consts::FRAC_PI_2, // 90° FOV
        1.0,
        0.1,
        100.0,
    );
    let eye = Vec3::new(0.0, 0.0, 5.0);
    let view = Mat4::look_at_rh(eye, Vec3::ZERO, Vec3::Y);
    Frustum::from_view_projection(&(projection * view)).with_origin(eye)
}

// ============================================================================
// Frustum::from_view_projection
// ============================================================================

#[test]
fn test_frustum_from_identity_matrix() {
    let frustum = Frustum::from_view_projection(&Mat4::IDENTITY);

    for plane in &frustum.planes {
        let normal_len = plane.truncate().length();
        assert!((normal_len - 1.0).abs() < 1e-5, "plane normal should be unit length");
    }
}

#[test]
fn test_frustum_from_perspective_projection_is_normalized() {
    let frustum = perspective_frustum();

    for plane in &frustum.planes {
        let normal_len = plane.truncate().length();
        assert!((normal_len - 1.0).abs() < 1e-4, "plane normal should be unit length");
    }
}

#[test]
fn test_frustum_plane_order() {
    let frustum = perspective_frustum();
    let normal = |plane: usize| frustum.planes[plane].truncate();

    // Camera looks down -Z, all normals point into the volume
    assert!(normal(PLANE_LEFT).x > 0.0);
    assert!(normal(PLANE_RIGHT).x < 0.0);
    assert!(normal(PLANE_BOTTOM).y > 0.0);
    assert!(normal(PLANE_TOP).y < 0.0);
    assert!(normal(PLANE_NEAR).z < 0.0);
    assert!(normal(PLANE_FAR).z > 0.0);
}

#[test]
fn test_box_frustum_plane_order() {
    let frustum = box_frustum(10.0);
    assert_eq!(frustum.planes[PLANE_LEFT], Vec4::new(1.0, 0.0, 0.0, 10.0));
    assert_eq!(frustum.planes[PLANE_TOP], Vec4::new(0.0, -1.0, 0.0, 10.0));
    assert_eq!(frustum.planes[PLANE_FAR], Vec4::new(0.0, 0.0, -1.0, 10.0));
}

#[test]
fn test_origin_defaults_to_zero_and_can_be_set() {
    let frustum = Frustum::from_view_projection(&Mat4::IDENTITY);
    assert_eq!(frustum.origin(), Vec3::ZERO);

    let moved = frustum.with_origin(Vec3::new(1.0, 2.0, 3.0));
    assert_eq!(moved.origin(), Vec3::new(1.0, 2.0, 3.0));
}

// ============================================================================
// Frustum::classify_sphere
// ============================================================================

#[test]
fn test_classify_sphere_inside_box() {
    let frustum = box_frustum(10.0);
    let sphere = BoundingSphere::new(Vec3::new(2.0, -3.0, 1.0), 1.0);
    assert_eq!(frustum.classify_sphere(&sphere), FrustumTest::Inside);
}

#[test]
fn test_classify_sphere_outside_box() {
    let frustum = box_frustum(10.0);
    let sphere = BoundingSphere::new(Vec3::new(20.0, 0.0, 0.0), 1.0);
    assert_eq!(frustum.classify_sphere(&sphere), FrustumTest::Outside);
}

#[test]
fn test_classify_sphere_straddling_box() {
    let frustum = box_frustum(10.0);
    let sphere = BoundingSphere::new(Vec3::new(10.0, 0.0, 0.0), 2.0);
    assert_eq!(frustum.classify_sphere(&sphere), FrustumTest::Partial);
}

#[test]
fn test_classify_large_sphere_enclosing_box_is_partial() {
    let frustum = box_frustum(1.0);
    let sphere = BoundingSphere::new(Vec3::ZERO, 100.0);
    assert_eq!(frustum.classify_sphere(&sphere), FrustumTest::Partial);
}

#[test]
fn test_classify_sphere_in_front_of_camera() {
    let frustum = perspective_frustum();
    let sphere = BoundingSphere::new(Vec3::ZERO, 1.0);
    assert_eq!(frustum.classify_sphere(&sphere), FrustumTest::Inside);
}

#[test]
fn test_classify_sphere_behind_camera() {
    let frustum = perspective_frustum();
    let sphere = BoundingSphere::new(Vec3::new(0.0, 0.0, 20.0), 1.0);
    assert_eq!(frustum.classify_sphere(&sphere), FrustumTest::Outside);
}

#[test]
fn test_classify_sphere_far_to_the_side() {
    let frustum = perspective_frustum();
    let sphere = BoundingSphere::new(Vec3::new(100.0, 0.0, 0.0), 1.0);
    assert_eq!(frustum.classify_sphere(&sphere), FrustumTest::Outside);
}
