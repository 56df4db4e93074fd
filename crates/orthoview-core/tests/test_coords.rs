mod common;

use common::assert_close3;
use orthoview_core::coords::{AxisPermutation, CoordinateTransform, Plane};
use orthoview_core::error::OrthoviewError;
use orthoview_core::source::DisplayOrientation;

// ---------------------------------------------------------------------------
// AxisPermutation
// ---------------------------------------------------------------------------

#[test]
fn test_compose_matches_nested_application() {
    let a = AxisPermutation::new([2, -3, 1]);
    let b = AxisPermutation::new([-1, 3, 2]);
    let x = [1.0, 2.0, 3.0];
    assert_eq!(a.apply(b.apply(x)), [3.0, -2.0, -1.0]);
    assert_eq!(a.compose(&b).apply(x), a.apply(b.apply(x)));
}

#[test]
fn test_inverse_undoes_apply() {
    let p = AxisPermutation::new([3, -1, -2]);
    let x = [4.0, -5.0, 6.5];
    assert_eq!(p.apply_inverse(p.apply(x)), x);
    assert_eq!(p.inverse().inverse(), p);
}

#[test]
fn test_apply_unsigned_reorders_sizes() {
    let p = AxisPermutation::new([-2, 3, 1]);
    assert_eq!(p.apply_unsigned([10u32, 20, 30]), [20, 30, 10]);
}

#[test]
fn test_try_new_error_variant() {
    match AxisPermutation::try_new([1, 1, 2]) {
        Err(OrthoviewError::InvalidPermutation(axes)) => assert_eq!(axes, [1, 1, 2]),
        other => panic!("unexpected result: {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Orientation codes
// ---------------------------------------------------------------------------

#[test]
fn test_rai_is_identity() {
    assert!(AxisPermutation::from_orientation_code("RAI").unwrap().is_identity());
}

#[test]
fn test_lps_flips_every_axis() {
    let p = AxisPermutation::from_orientation_code("LPS").unwrap();
    assert_eq!(p.signed_axes(), [-1, -2, -3]);
}

#[test]
fn test_oblique_code_permutes_axes() {
    let p = AxisPermutation::from_orientation_code("ASR").unwrap();
    assert_eq!(p.signed_axes(), [3, 1, -2]);
}

#[test]
fn test_orientation_code_round_trip() {
    for code in ["RAI", "LPS", "ASR", "SLP", "IRA"] {
        let p = AxisPermutation::from_orientation_code(code).unwrap();
        assert_eq!(p.to_orientation_code(), code);
    }
}

#[test]
fn test_lowercase_code_accepted() {
    assert_eq!(
        AxisPermutation::from_orientation_code("lps").unwrap(),
        AxisPermutation::from_orientation_code("LPS").unwrap()
    );
}

#[test]
fn test_invalid_orientation_codes() {
    for code in ["RAX", "RLA", "RA", "RAIS", ""] {
        assert!(
            matches!(
                AxisPermutation::from_orientation_code(code),
                Err(OrthoviewError::InvalidOrientation(_))
            ),
            "{code} should be rejected"
        );
    }
}

// ---------------------------------------------------------------------------
// Planes and display orientation
// ---------------------------------------------------------------------------

#[test]
fn test_plane_anatomy_to_display() {
    assert_eq!(Plane::Axial.anatomy_to_display().signed_axes(), [1, -2, 3]);
    assert_eq!(Plane::Coronal.anatomy_to_display().signed_axes(), [1, 3, 2]);
    assert_eq!(Plane::Sagittal.anatomy_to_display().signed_axes(), [2, 3, 1]);
}

#[test]
fn test_plane_from_index() {
    for plane in Plane::ALL {
        assert_eq!(Plane::from_index(plane.index()).unwrap(), plane);
    }
    assert!(matches!(
        Plane::from_index(3),
        Err(OrthoviewError::WindowIndexOutOfRange { index: 3, total: 3 })
    ));
}

#[test]
fn test_image_to_display_composes_orientation() {
    let orientation = DisplayOrientation::from_code("LPS").unwrap();
    assert_eq!(
        orientation.image_to_display(Plane::Axial).signed_axes(),
        [-1, 2, -3]
    );
    let round = orientation
        .display_to_image(Plane::Axial)
        .compose(&orientation.image_to_display(Plane::Axial));
    assert!(round.is_identity());
}

#[test]
fn test_display_to_anatomy_ignores_image_orientation() {
    let rai = DisplayOrientation::from_code("RAI").unwrap();
    let asr = DisplayOrientation::from_code("ASR").unwrap();
    for plane in Plane::ALL {
        assert_eq!(rai.display_to_anatomy(plane), asr.display_to_anatomy(plane));
        assert_eq!(
            rai.display_to_anatomy(plane),
            plane.anatomy_to_display().inverse()
        );
    }
}

// ---------------------------------------------------------------------------
// CoordinateTransform
// ---------------------------------------------------------------------------

#[test]
fn test_transform_inverse_round_trip() {
    let t = CoordinateTransform::for_extent(AxisPermutation::new([-2, 3, -1]), [4, 5, 6]);
    let p = [1.25, 3.5, 0.75];
    assert_close3(t.inverse().apply_point(t.apply_point(p)), p);
    assert_close3(t.apply_inverse_point(t.apply_point(p)), p);
}

#[test]
fn test_transform_compose_matches_nested() {
    let a = CoordinateTransform::for_extent(AxisPermutation::new([-2, 3, -1]), [4, 5, 6]);
    let b = CoordinateTransform::for_extent(AxisPermutation::new([3, -1, 2]), [7, 8, 9]);
    let p = [0.5, 2.0, 6.25];
    assert_close3(a.compose(&b).apply_point(p), a.apply_point(b.apply_point(p)));
}

#[test]
fn test_apply_index_stays_in_volume() {
    let dims = [4, 5, 6];
    let t = CoordinateTransform::for_extent(AxisPermutation::new([-2, 3, -1]), dims);
    let target = t.apply_size(dims);
    assert_eq!(target, [5, 6, 4]);
    for x in 0..dims[0] {
        for y in 0..dims[1] {
            for z in 0..dims[2] {
                let q = t.apply_index([x, y, z]);
                assert!((0..3).all(|i| q[i] < target[i]));
                assert_eq!(t.inverse().apply_index(q), [x, y, z]);
            }
        }
    }
}

#[test]
fn test_apply_vector_ignores_offset() {
    let t = CoordinateTransform::for_extent(AxisPermutation::new([-1, 2, 3]), [10, 1, 1]);
    assert_eq!(t.apply_vector([1.0, 0.0, 0.0]), [-1.0, 0.0, 0.0]);
    assert_eq!(t.offset(), [10.0, 0.0, 0.0]);
}
