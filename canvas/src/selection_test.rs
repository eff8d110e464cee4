#![allow(clippy::float_cmp)]

use super::*;
use crate::scene::{ImageOrigin, StrokeObject, StrokePoint};

fn add_image(scene: &mut Scene, left: f64, top: f64, w: f64, h: f64) -> ObjectId {
    let img = ImageObject::new("a.png", ImageOrigin::Upload, left, top, w, h).unwrap();
    scene.insert(SceneObject::Image(img))
}

fn add_stroke(scene: &mut Scene, points: &[(f64, f64)]) -> ObjectId {
    let pts = points.iter().map(|&(x, y)| StrokePoint::new(x, y, 0.5)).collect();
    scene.insert(SceneObject::Stroke(StrokeObject::new(pts)))
}

// =============================================================
// Selection set
// =============================================================

#[test]
fn replace_reports_change() {
    let mut sel = Selection::new();
    let id = uuid::Uuid::new_v4();
    assert!(sel.select_only(id));
    assert!(!sel.select_only(id));
    assert!(sel.contains(&id));
    assert!(sel.clear());
    assert!(!sel.clear());
}

#[test]
fn prune_drops_removed_objects() {
    let mut scene = Scene::new();
    let a = add_image(&mut scene, 0.0, 0.0, 10.0, 10.0);
    let b = add_image(&mut scene, 20.0, 0.0, 10.0, 10.0);
    let mut sel = Selection::new();
    sel.replace(vec![a, b]);
    scene.remove(&a);
    assert_eq!(sel.resolve(&scene).count(), 1);
    assert!(sel.prune(&scene));
    assert_eq!(sel.ids(), &[b]);
}

#[test]
fn bounds_union_covers_images_and_strokes() {
    let mut scene = Scene::new();
    let a = add_image(&mut scene, 0.0, 0.0, 100.0, 50.0);
    let s = add_stroke(&mut scene, &[(200.0, 200.0), (250.0, 260.0)]);
    let mut sel = Selection::new();
    sel.replace(vec![a, s]);
    let b = sel.bounds(&scene).unwrap();
    assert_eq!(b.left, 0.0);
    assert_eq!(b.top, 0.0);
    assert_eq!(b.right(), 251.0);
    assert_eq!(b.bottom(), 261.0);
}

#[test]
fn bounds_none_when_empty() {
    assert!(Selection::new().bounds(&Scene::new()).is_none());
}

#[test]
fn image_ids_skip_strokes() {
    let mut scene = Scene::new();
    let a = add_image(&mut scene, 0.0, 0.0, 100.0, 50.0);
    let s = add_stroke(&mut scene, &[(0.0, 0.0)]);
    let mut sel = Selection::new();
    sel.replace(vec![s, a]);
    assert_eq!(sel.image_ids(&scene), vec![a]);
}

// =============================================================
// Popup anchor
// =============================================================

#[test]
fn popup_anchor_sits_below_bottom_left() {
    let mut scene = Scene::new();
    let a = add_image(&mut scene, 100.0, 100.0, 200.0, 100.0);
    let mut sel = Selection::new();
    sel.select_only(a);
    let cam = Camera { pan_x: 10.0, pan_y: 20.0, zoom: 2.0 };
    let p = sel.popup_anchor(&scene, &cam, 2000.0, 2000.0).unwrap();
    assert_eq!(p, Point::new(210.0, 420.0 + POPUP_GAP_PX));
}

#[test]
fn popup_anchor_clamps_to_margins() {
    let mut scene = Scene::new();
    let a = add_image(&mut scene, -500.0, -500.0, 100.0, 100.0);
    let mut sel = Selection::new();
    sel.select_only(a);
    let p = sel.popup_anchor(&scene, &Camera::default(), 800.0, 600.0).unwrap();
    assert_eq!(p, Point::new(POPUP_MARGIN_PX, POPUP_MARGIN_PX));

    let far = add_image(&mut scene, 5000.0, 5000.0, 10.0, 10.0);
    sel.select_only(far);
    let p = sel.popup_anchor(&scene, &Camera::default(), 800.0, 600.0).unwrap();
    assert_eq!(p.x, 800.0 - POPUP_MARGIN_PX - POPUP_WIDTH_PX);
    assert_eq!(p.y, 600.0 - POPUP_MARGIN_PX - POPUP_HEIGHT_PX);
}

// =============================================================
// Marquee
// =============================================================

#[test]
fn marquee_selects_exactly_intersecting_images() {
    let mut scene = Scene::new();
    let cam = Camera { pan_x: -100.0, pan_y: 40.0, zoom: 0.5 };
    let rects = [
        (0.0, 0.0, 100.0, 100.0),
        (350.0, 120.0, 80.0, 80.0),
        (900.0, 900.0, 50.0, 50.0),
        (390.0, -300.0, 20.0, 20.0),
        (600.0, 200.0, 10.0, 10.0),
    ];
    let ids: Vec<_> = rects.iter().map(|&(l, t, w, h)| add_image(&mut scene, l, t, w, h)).collect();
    let marquee = Rect::new(60.0, 60.0, 200.0, 150.0);

    let world = cam.screen_rect_to_world(&marquee);
    let expected: Vec<_> = rects
        .iter()
        .zip(&ids)
        .filter(|(r, _)| world.intersects(&Rect::new(r.0, r.1, r.2, r.3)))
        .map(|(_, id)| *id)
        .collect();

    assert_eq!(marquee_select(&scene, &cam, &marquee), expected);
    assert_eq!(expected, vec![ids[1], ids[4]]);
}

#[test]
fn marquee_picks_crossing_stroke() {
    let mut scene = Scene::new();
    let s = add_stroke(&mut scene, &[(-50.0, 50.0), (500.0, 50.0)]);
    add_stroke(&mut scene, &[(-50.0, 500.0), (500.0, 500.0)]);
    let got = marquee_select(&scene, &Camera::default(), &Rect::new(100.0, 0.0, 50.0, 100.0));
    assert_eq!(got, vec![s]);
}

#[test]
fn marquee_respects_zoom_and_pan() {
    let mut scene = Scene::new();
    let a = add_image(&mut scene, 100.0, 100.0, 10.0, 10.0);
    let cam = Camera { pan_x: 50.0, pan_y: 50.0, zoom: 2.0 };
    // Image spans screen (250..270, 250..270).
    assert_eq!(marquee_select(&scene, &cam, &Rect::new(240.0, 240.0, 20.0, 20.0)), vec![a]);
    assert!(marquee_select(&scene, &cam, &Rect::new(100.0, 100.0, 100.0, 100.0)).is_empty());
}
