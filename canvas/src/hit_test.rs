use super::*;
use crate::scene::{ImageOrigin, SceneObject, StrokePoint};

fn image_at(left: f64, top: f64, width: f64, height: f64) -> ImageObject {
    ImageObject::new("a.png", ImageOrigin::Upload, left, top, width, height).unwrap()
}

fn stroke(points: &[(f64, f64)]) -> StrokeObject {
    StrokeObject::new(points.iter().map(|&(x, y)| StrokePoint::new(x, y, 0.5)).collect())
}

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

// =============================================================
// Corner
// =============================================================

#[test]
fn corner_sides_and_diagonals() {
    assert!(Corner::TopLeft.is_left());
    assert!(Corner::BottomLeft.is_left());
    assert!(!Corner::TopRight.is_left());
    assert!(Corner::TopLeft.is_nwse());
    assert!(Corner::BottomRight.is_nwse());
    assert!(!Corner::BottomLeft.is_nwse());
}

// =============================================================
// Resize handles
// =============================================================

#[test]
fn resize_handle_each_corner() {
    let img = image_at(100.0, 100.0, 200.0, 100.0);
    assert_eq!(hit_test_resize_handle(&img, pt(100.0, 100.0), 14.0), Some(Corner::TopLeft));
    assert_eq!(hit_test_resize_handle(&img, pt(305.0, 95.0), 14.0), Some(Corner::TopRight));
    assert_eq!(hit_test_resize_handle(&img, pt(90.0, 200.0), 14.0), Some(Corner::BottomLeft));
    assert_eq!(hit_test_resize_handle(&img, pt(300.0, 210.0), 14.0), Some(Corner::BottomRight));
}

#[test]
fn resize_handle_none_in_body() {
    let img = image_at(100.0, 100.0, 200.0, 100.0);
    assert_eq!(hit_test_resize_handle(&img, pt(200.0, 150.0), 14.0), None);
}

#[test]
fn resize_handle_tie_prefers_top_left() {
    // A tiny image puts every corner inside the radius.
    let img = image_at(0.0, 0.0, 4.0, 4.0);
    assert_eq!(hit_test_resize_handle(&img, pt(2.0, 2.0), 14.0), Some(Corner::TopLeft));
}

#[test]
fn resize_handle_tie_top_right_before_bottom_left() {
    let img = image_at(0.0, 0.0, 10.0, 10.0);
    // Equidistant from top-right (10,0) and bottom-left (0,10), out of reach of top-left.
    assert_eq!(hit_test_resize_handle(&img, pt(10.0, 10.0), 10.0), Some(Corner::TopRight));
}

// =============================================================
// pick_top_object_at
// =============================================================

#[test]
fn pick_returns_none_on_empty_scene() {
    assert!(pick_top_object_at(&Scene::new(), pt(0.0, 0.0)).is_none());
}

#[test]
fn pick_prefers_topmost_image() {
    let mut scene = Scene::new();
    scene.insert(SceneObject::Image(image_at(0.0, 0.0, 100.0, 100.0)));
    let top = scene.insert(SceneObject::Image(image_at(50.0, 50.0, 100.0, 100.0)));
    let hit = pick_top_object_at(&scene, pt(75.0, 75.0)).unwrap();
    assert_eq!(hit.object_id, top);
    assert_eq!(hit.kind, HitKind::Image);
    assert_eq!(hit.part, HitPart::Body);
}

#[test]
fn pick_includes_handle_slop_outside_image() {
    let mut scene = Scene::new();
    let id = scene.insert(SceneObject::Image(image_at(100.0, 100.0, 100.0, 100.0)));
    let hit = pick_top_object_at(&scene, pt(92.0, 92.0)).unwrap();
    assert_eq!(hit.object_id, id);
    assert_eq!(hit.part, HitPart::ResizeHandle(Corner::TopLeft));
    assert!(pick_top_object_at(&scene, pt(80.0, 80.0)).is_none());
}

#[test]
fn pick_image_beats_stroke_drawn_over_it() {
    let mut scene = Scene::new();
    let img = scene.insert(SceneObject::Image(image_at(0.0, 0.0, 100.0, 100.0)));
    scene.insert(SceneObject::Stroke(stroke(&[(10.0, 50.0), (90.0, 50.0)])));
    assert_eq!(pick_top_object_at(&scene, pt(50.0, 50.0)).map(|h| h.object_id), Some(img));
}

#[test]
fn pick_falls_back_to_stroke() {
    let mut scene = Scene::new();
    scene.insert(SceneObject::Image(image_at(0.0, 0.0, 100.0, 100.0)));
    let s = scene.insert(SceneObject::Stroke(stroke(&[(300.0, 50.0), (400.0, 50.0)])));
    let hit = pick_top_object_at(&scene, pt(350.0, 52.0)).unwrap();
    assert_eq!(hit.object_id, s);
    assert_eq!(hit.kind, HitKind::Stroke);
}

#[test]
fn pick_uses_rendered_quad_for_scaled_images() {
    let mut scene = Scene::new();
    let mut img = image_at(100.0, 100.0, 100.0, 100.0);
    img.set_scale(3.0, 3.0);
    let id = scene.insert(SceneObject::Image(img));
    // Outside the logical box but inside the scaled rendering.
    let hit = pick_top_object_at(&scene, pt(20.0, 150.0)).unwrap();
    assert_eq!(hit.object_id, id);
    assert_eq!(hit.part, HitPart::Body);
}

#[test]
fn image_contains_respects_rotation() {
    let mut img = image_at(0.0, 0.0, 200.0, 20.0);
    img.set_rotation(90.0);
    // Rotated bar now extends vertically through the center (100, 10).
    assert!(image_contains(&img, pt(100.0, -80.0), 0.0));
    assert!(!image_contains(&img, pt(-10.0, 10.0), 0.0));
    assert!(!image_contains(&img, pt(100.0, -120.0), 0.0));
}

// =============================================================
// Stroke geometry
// =============================================================

#[test]
fn distance_to_segment_cases() {
    assert!((distance_to_segment(pt(5.0, 3.0), pt(0.0, 0.0), pt(10.0, 0.0)) - 3.0).abs() < 1e-9);
    assert!((distance_to_segment(pt(-3.0, 4.0), pt(0.0, 0.0), pt(10.0, 0.0)) - 5.0).abs() < 1e-9);
    assert!((distance_to_segment(pt(3.0, 4.0), pt(0.0, 0.0), pt(0.0, 0.0)) - 5.0).abs() < 1e-9);
}

#[test]
fn stroke_hits_point_with_tolerance() {
    let s = stroke(&[(0.0, 0.0), (100.0, 0.0)]);
    assert!(stroke_hits_point(&s, pt(50.0, 3.5), 3.0));
    assert!(!stroke_hits_point(&s, pt(50.0, 10.0), 3.0));
}

#[test]
fn single_point_stroke_hits_nearby() {
    let s = stroke(&[(10.0, 10.0)]);
    assert!(stroke_hits_point(&s, pt(12.0, 10.0), 3.0));
    assert!(!stroke_hits_point(&s, pt(30.0, 10.0), 3.0));
}

#[test]
fn stroke_crossing_rect_without_vertices_inside() {
    let s = stroke(&[(-100.0, 50.0), (200.0, 50.0)]);
    let r = Rect::new(0.0, 0.0, 100.0, 100.0);
    assert!(stroke_intersects_rect(&s, &r, 2.0));
}

#[test]
fn stroke_outside_rect_misses() {
    let s = stroke(&[(200.0, 200.0), (300.0, 300.0)]);
    let r = Rect::new(0.0, 0.0, 100.0, 100.0);
    assert!(!stroke_intersects_rect(&s, &r, 2.0));
}

#[test]
fn stroke_just_outside_is_caught_by_tolerance() {
    let s = stroke(&[(102.0, 0.0), (102.0, 100.0)]);
    let r = Rect::new(0.0, 0.0, 100.0, 100.0);
    assert!(stroke_intersects_rect(&s, &r, 2.0));
    assert!(!stroke_intersects_rect(&s, &Rect::new(0.0, 0.0, 90.0, 100.0), 2.0));
}

#[test]
fn segment_intersects_rect_diagonal() {
    let r = Rect::new(0.0, 0.0, 10.0, 10.0);
    assert!(segment_intersects_rect(pt(-5.0, 5.0), pt(5.0, -5.0), &r));
    assert!(!segment_intersects_rect(pt(-5.0, 20.0), pt(20.0, 15.0), &r));
}
