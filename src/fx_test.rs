#![allow(clippy::float_cmp)]

use std::cell::Cell;
use std::f64::consts::FRAC_PI_2;
use std::rc::Rc;

use super::*;
use crate::config::EngineConfig;
use crate::contact::Contact;
use crate::effect::EffectScheduler;
use crate::testkit::{Marker, Probe, approx_eq, point_approx_eq};

fn p(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn probe(scene: &mut Scene, x: f64, y: f64) -> ObjectId {
    scene.add(Probe::new(p(x, y), 10.0).0)
}

fn step(scene: &mut Scene, effects: &mut EffectScheduler, now: f64) -> bool {
    let frame = scene.tick(now);
    effects.dispatch(&SceneEvent::Frame(&frame), scene).expect("frame dispatch")
}

fn pointer(scene: &mut Scene, effects: &mut EffectScheduler, event: PointerEvent) -> bool {
    effects.dispatch(&SceneEvent::Pointer(&event), scene).expect("pointer dispatch")
}

fn drag(origin: Point, point: Point, contact: Option<Contact>) -> PointerEvent {
    drag_in(1, origin, point, contact)
}

fn drag_in(session: u64, origin: Point, point: Point, contact: Option<Contact>) -> PointerEvent {
    PointerEvent::Drag(Drag { origin, contact, point, session })
}

// =============================================================
// Movement
// =============================================================

#[test]
fn linear_movement_interpolates_and_lands_exactly() {
    let movement = Movement::new(p(0.0, 0.0), p(10.0, 0.0), 100.0);
    assert_eq!(movement.point_at(50.0), p(5.0, 0.0));
    assert!(!movement.is_done(99.0));
    assert_eq!(movement.point_at(100.0), p(10.0, 0.0));
    assert_eq!(movement.point_at(250.0), p(10.0, 0.0));
}

#[test]
fn eased_movement_follows_the_ease_curve() {
    let movement = Movement::new(p(0.0, 0.0), p(10.0, 0.0), 100.0).eased();
    let expected = 10.0 * (1.0 - (FRAC_PI_2).sin() / FRAC_PI_2);
    assert!(approx_eq(movement.point_at(25.0).x, expected));
    assert_eq!(movement.point_at(0.0), p(0.0, 0.0));
    assert_eq!(movement.point_at(100.0), p(10.0, 0.0));
}

#[test]
fn speed_sets_duration_from_distance() {
    let movement = Movement::at_speed(p(0.0, 0.0), p(30.0, 40.0), 100.0);
    assert!(approx_eq(movement.duration(), 500.0));
}

#[test]
fn non_positive_speed_arrives_immediately() {
    let movement = Movement::at_speed(p(0.0, 0.0), p(30.0, 40.0), 0.0);
    assert_eq!(movement.duration(), 0.0);
    assert_eq!(movement.point_at(0.0), p(30.0, 40.0));
}

#[test]
fn curved_movements_bend_through_their_controls() {
    let arc = Movement::quadratic(p(0.0, 0.0), p(50.0, 100.0), p(100.0, 0.0), 100.0);
    assert!(point_approx_eq(arc.point_at(50.0), p(50.0, 50.0)));
    assert_eq!(arc.point_at(100.0), p(100.0, 0.0));

    let hump = Movement::bezier(p(0.0, 0.0), p(0.0, 100.0), p(100.0, 100.0), p(100.0, 0.0), 100.0);
    assert!(point_approx_eq(hump.point_at(50.0), p(50.0, 75.0)));
    assert_eq!(hump.point_at(0.0), p(0.0, 0.0));
    assert_eq!(hump.point_at(100.0), p(100.0, 0.0));
}

#[test]
fn curves_at_speed_time_the_chord() {
    let arc = Movement::quadratic_at_speed(p(0.0, 0.0), p(500.0, 500.0), p(30.0, 40.0), 100.0);
    assert!(approx_eq(arc.duration(), 500.0));
    let hump = Movement::bezier_at_speed(p(0.0, 0.0), p(0.0, 90.0), p(30.0, 90.0), p(30.0, 40.0), 50.0);
    assert!(approx_eq(hump.duration(), 1000.0));
    assert_eq!(Movement::bezier_at_speed(p(0.0, 0.0), p(1.0, 1.0), p(2.0, 2.0), p(3.0, 3.0), -1.0).duration(), 0.0);
}

// =============================================================
// MoveTo
// =============================================================

#[test]
fn move_to_reaches_the_target_and_finishes() {
    let mut scene = Scene::new();
    let id = probe(&mut scene, 0.0, 0.0);
    let mut effects = EffectScheduler::new();
    let fx = effects.play(Box::new(MoveTo::new(id, p(100.0, 0.0), 100.0)));

    assert!(!step(&mut scene, &mut effects, 1000.0));
    assert!(step(&mut scene, &mut effects, 1050.0));
    assert_eq!(scene.position(id), Some(p(50.0, 0.0)));
    assert!(step(&mut scene, &mut effects, 1100.0));
    assert_eq!(scene.position(id), Some(p(100.0, 0.0)));
    assert!(!effects.is_playing(fx));
}

#[test]
fn move_to_at_speed_and_explicit_start() {
    let mut scene = Scene::new();
    let id = probe(&mut scene, 500.0, 500.0);
    let mut effects = EffectScheduler::new();
    effects.play(Box::new(MoveTo::at_speed(id, p(100.0, 0.0), 1000.0).starting_at(p(0.0, 0.0))));

    step(&mut scene, &mut effects, 0.0);
    step(&mut scene, &mut effects, 50.0);
    assert!(point_approx_eq(scene.position(id).expect("positioned"), p(50.0, 0.0)));
    step(&mut scene, &mut effects, 100.0);
    assert_eq!(scene.position(id), Some(p(100.0, 0.0)));
    assert!(effects.is_empty());
}

#[test]
fn move_to_via_a_control_point_arcs_and_lands() {
    let mut scene = Scene::new();
    let id = probe(&mut scene, 0.0, 0.0);
    let mut effects = EffectScheduler::new();
    effects.play(Box::new(MoveTo::new(id, p(100.0, 0.0), 100.0).via(p(50.0, 100.0))));

    step(&mut scene, &mut effects, 0.0);
    step(&mut scene, &mut effects, 50.0);
    assert!(point_approx_eq(scene.position(id).expect("positioned"), p(50.0, 50.0)));
    step(&mut scene, &mut effects, 100.0);
    assert_eq!(scene.position(id), Some(p(100.0, 0.0)));
    assert!(effects.is_empty());
}

#[test]
fn move_to_via_a_pair_at_speed() {
    let mut scene = Scene::new();
    let id = probe(&mut scene, 0.0, 0.0);
    let mut effects = EffectScheduler::new();
    let trip = MoveTo::at_speed(id, p(100.0, 0.0), 1000.0).via_pair(p(0.0, 100.0), p(100.0, 100.0));
    effects.play(Box::new(trip));

    step(&mut scene, &mut effects, 0.0);
    step(&mut scene, &mut effects, 50.0);
    assert!(point_approx_eq(scene.position(id).expect("positioned"), p(50.0, 75.0)));
    step(&mut scene, &mut effects, 100.0);
    assert_eq!(scene.position(id), Some(p(100.0, 0.0)));
}

#[test]
fn move_to_finishes_on_unpositioned_target() {
    let mut scene = Scene::new();
    let id = scene.add(Marker("static"));
    let mut effects = EffectScheduler::new();
    effects.play(Box::new(MoveTo::new(id, p(1.0, 1.0), 10.0)));
    assert!(!step(&mut scene, &mut effects, 0.0));
    assert!(effects.is_empty());
}

#[test]
fn move_to_holds_still_while_paused() {
    let mut scene = Scene::new();
    let id = probe(&mut scene, 0.0, 0.0);
    let mut effects = EffectScheduler::new();
    effects.play(Box::new(MoveTo::new(id, p(100.0, 0.0), 100.0)));
    step(&mut scene, &mut effects, 0.0);
    step(&mut scene, &mut effects, 20.0);

    scene.pause();
    assert!(!step(&mut scene, &mut effects, 60.0));
    assert_eq!(scene.position(id), Some(p(20.0, 0.0)));

    scene.resume();
    step(&mut scene, &mut effects, 80.0);
    assert!(point_approx_eq(scene.position(id).expect("positioned"), p(40.0, 0.0)));
}

#[test]
fn move_to_follows_its_layer_pace() {
    let mut scene = Scene::new();
    let id = probe(&mut scene, 0.0, 0.0);
    scene.pace_layer(0, 0.5).expect("layer 0");
    let mut effects = EffectScheduler::new();
    effects.play(Box::new(MoveTo::new(id, p(100.0, 0.0), 100.0)));
    step(&mut scene, &mut effects, 0.0);
    step(&mut scene, &mut effects, 100.0);
    assert!(point_approx_eq(scene.position(id).expect("positioned"), p(50.0, 0.0)));
}

// =============================================================
// Spin, Oscillate, FollowVectors
// =============================================================

#[test]
fn spin_rotates_by_elapsed_fraction_of_a_turn() {
    let mut scene = Scene::new();
    let id = probe(&mut scene, 0.0, 0.0);
    let mut effects = EffectScheduler::new();
    effects.play(Box::new(Spin::new(id, 1000.0).expect("valid period")));

    assert!(!step(&mut scene, &mut effects, 0.0));
    assert!(step(&mut scene, &mut effects, 250.0));
    let [a, b, c, d, e, f] = scene.object_transform(id).expect("known").coefficients();
    assert!(approx_eq(a, 0.0) && approx_eq(b, 1.0) && approx_eq(c, -1.0) && approx_eq(d, 0.0));
    assert_eq!((e, f), (0.0, 0.0));
}

#[test]
fn spin_rejects_degenerate_period() {
    let id = ObjectId::new(1);
    assert!(matches!(Spin::new(id, 0.0), Err(SceneError::InvalidTiming { name: "period", .. })));
    assert!(matches!(Spin::new(id, f64::NAN), Err(SceneError::InvalidTiming { .. })));
    assert!(Spin::new(id, -500.0).is_ok());
}

#[test]
fn oscillate_sways_around_rest() {
    let mut scene = Scene::new();
    let id = probe(&mut scene, 0.0, 0.0);
    let mut effects = EffectScheduler::new();
    effects.play(Box::new(Oscillate::new(id, 10.0, Axis::Vertical, 1000.0).expect("valid period")));

    step(&mut scene, &mut effects, 0.0);
    step(&mut scene, &mut effects, 250.0);
    let [.., e, f] = scene.object_transform(id).expect("known").coefficients();
    assert!(approx_eq(e, 0.0) && approx_eq(f, 10.0));

    step(&mut scene, &mut effects, 500.0);
    let [.., f] = scene.object_transform(id).expect("known").coefficients();
    assert!(f.abs() < 1e-9);
}

#[test]
fn follow_vectors_jumps_once_per_period() {
    let mut scene = Scene::new();
    let id = probe(&mut scene, 0.0, 0.0);
    let mut effects = EffectScheduler::new();
    let vectors = vec![p(1.0, 0.0), p(0.0, 1.0)];
    effects.play(Box::new(FollowVectors::new(id, vectors, 100.0).expect("valid")));

    assert!(!step(&mut scene, &mut effects, 0.0));
    assert!(step(&mut scene, &mut effects, 10.0));
    assert!(!step(&mut scene, &mut effects, 50.0));
    assert!(step(&mut scene, &mut effects, 110.0));
    assert!(step(&mut scene, &mut effects, 210.0));
    let [.., e, f] = scene.object_transform(id).expect("known").coefficients();
    assert_eq!((e, f), (2.0, 1.0));
}

#[test]
fn follow_vectors_validates_input() {
    let id = ObjectId::new(1);
    assert!(matches!(FollowVectors::new(id, Vec::new(), 100.0), Err(SceneError::Config(_))));
    assert!(matches!(FollowVectors::new(id, vec![p(1.0, 0.0)], 0.0), Err(SceneError::InvalidTiming { .. })));
}

// =============================================================
// DragFollow
// =============================================================

#[test]
fn drag_keeps_grab_offset() {
    let mut scene = Scene::new();
    let id = probe(&mut scene, 100.0, 100.0);
    let mut effects = EffectScheduler::new();
    effects.play(Box::new(DragFollow::new(id)));

    let contact = Contact { object: id, vector: p(2.0, 3.0) };
    assert!(pointer(&mut scene, &mut effects, drag(p(102.0, 103.0), p(150.0, 160.0), Some(contact))));
    assert_eq!(scene.position(id), Some(p(148.0, 157.0)));
}

#[test]
fn drag_maps_through_the_layer_transform() {
    let mut scene = Scene::new();
    let id = probe(&mut scene, 10.0, 10.0);
    scene.transform_layer(0, &Affine::scaling(2.0, 2.0)).expect("layer 0");
    let mut effects = EffectScheduler::new();
    effects.play(Box::new(DragFollow::new(id)));

    let contact = Contact { object: id, vector: Point::ORIGIN };
    pointer(&mut scene, &mut effects, drag(p(20.0, 20.0), p(60.0, 40.0), Some(contact)));
    assert_eq!(scene.position(id), Some(p(30.0, 20.0)));
}

#[test]
fn drag_of_another_object_is_ignored() {
    let mut scene = Scene::new();
    let id = probe(&mut scene, 0.0, 0.0);
    let other = probe(&mut scene, 100.0, 0.0);
    let mut effects = EffectScheduler::new();
    effects.play(Box::new(DragFollow::new(id)));

    let contact = Contact { object: other, vector: Point::ORIGIN };
    assert!(!pointer(&mut scene, &mut effects, drag(p(100.0, 0.0), p(200.0, 0.0), Some(contact))));
    assert!(!pointer(&mut scene, &mut effects, drag(p(0.0, 0.0), p(50.0, 0.0), None)));
    assert_eq!(scene.position(id), Some(p(0.0, 0.0)));
}

#[test]
fn colliding_drop_springs_back_home() {
    let mut scene = Scene::new();
    let id = probe(&mut scene, 100.0, 100.0);
    probe(&mut scene, 200.0, 100.0);
    let mut effects = EffectScheduler::new();
    effects.play(Box::new(DragFollow::new(id).with_spring_back(100.0)));

    let contact = Contact { object: id, vector: Point::ORIGIN };
    pointer(&mut scene, &mut effects, drag(p(100.0, 100.0), p(195.0, 100.0), Some(contact)));
    pointer(&mut scene, &mut effects, PointerEvent::End(p(195.0, 100.0)));

    assert!(!step(&mut scene, &mut effects, 0.0));
    assert!(step(&mut scene, &mut effects, 25.0));
    assert!(scene.position(id).is_some_and(|pos| pos.x > 100.0 && pos.x < 195.0));
    assert!(step(&mut scene, &mut effects, 100.0));
    assert_eq!(scene.position(id), Some(p(100.0, 100.0)));
    assert!(!step(&mut scene, &mut effects, 150.0));
    assert_eq!(effects.len(), 1);
}

#[test]
fn clean_drop_stays_put() {
    let mut scene = Scene::new();
    let id = probe(&mut scene, 100.0, 100.0);
    probe(&mut scene, 400.0, 100.0);
    let mut effects = EffectScheduler::new();
    effects.play(Box::new(DragFollow::new(id).springy(&EngineConfig::default())));

    let contact = Contact { object: id, vector: Point::ORIGIN };
    pointer(&mut scene, &mut effects, drag(p(100.0, 100.0), p(200.0, 100.0), Some(contact)));
    pointer(&mut scene, &mut effects, PointerEvent::End(p(200.0, 100.0)));
    step(&mut scene, &mut effects, 0.0);
    assert!(!step(&mut scene, &mut effects, 600.0));
    assert_eq!(scene.position(id), Some(p(200.0, 100.0)));
}

#[test]
fn springy_uses_the_configured_duration() {
    let mut scene = Scene::new();
    let id = probe(&mut scene, 100.0, 100.0);
    probe(&mut scene, 200.0, 100.0);
    let config = EngineConfig { spring_back_ms: 40.0, ..EngineConfig::default() };
    let mut effects = EffectScheduler::new();
    effects.play(Box::new(DragFollow::new(id).springy(&config)));

    let contact = Contact { object: id, vector: Point::ORIGIN };
    pointer(&mut scene, &mut effects, drag(p(100.0, 100.0), p(195.0, 100.0), Some(contact)));
    pointer(&mut scene, &mut effects, PointerEvent::End(p(195.0, 100.0)));
    step(&mut scene, &mut effects, 0.0);
    assert!(step(&mut scene, &mut effects, 40.0));
    assert_eq!(scene.position(id), Some(p(100.0, 100.0)));
}

// =============================================================
// GlideToPress
// =============================================================

#[test]
fn press_on_empty_space_glides_the_target_there() {
    let mut scene = Scene::new();
    let id = probe(&mut scene, 0.0, 0.0);
    let mut effects = EffectScheduler::new();
    effects.play(Box::new(GlideToPress::new(id).with_duration(100.0)));

    assert!(!pointer(&mut scene, &mut effects, PointerEvent::Start(p(200.0, 0.0))));
    assert!(!step(&mut scene, &mut effects, 0.0));
    assert!(step(&mut scene, &mut effects, 25.0));
    assert!(scene.position(id).is_some_and(|pos| pos.x > 0.0 && pos.x < 200.0));
    assert!(step(&mut scene, &mut effects, 100.0));
    assert_eq!(scene.position(id), Some(p(200.0, 0.0)));
    assert!(!step(&mut scene, &mut effects, 200.0));
    assert_eq!(effects.len(), 1);
}

#[test]
fn press_on_an_object_does_not_glide() {
    let mut scene = Scene::new();
    let id = probe(&mut scene, 0.0, 0.0);
    probe(&mut scene, 200.0, 0.0);
    let mut effects = EffectScheduler::new();
    effects.play(Box::new(GlideToPress::new(id)));

    pointer(&mut scene, &mut effects, PointerEvent::Start(p(200.0, 0.0)));
    pointer(&mut scene, &mut effects, PointerEvent::Start(p(0.0, 0.0)));
    step(&mut scene, &mut effects, 0.0);
    assert!(!step(&mut scene, &mut effects, 100.0));
    assert_eq!(scene.position(id), Some(p(0.0, 0.0)));
}

#[test]
fn new_press_redirects_the_glide() {
    let mut scene = Scene::new();
    let id = probe(&mut scene, 0.0, 0.0);
    let mut effects = EffectScheduler::new();
    effects.play(Box::new(GlideToPress::new(id).with_duration(100.0)));

    pointer(&mut scene, &mut effects, PointerEvent::Start(p(200.0, 0.0)));
    step(&mut scene, &mut effects, 0.0);
    step(&mut scene, &mut effects, 25.0);
    pointer(&mut scene, &mut effects, PointerEvent::Start(p(0.0, 300.0)));
    step(&mut scene, &mut effects, 40.0);
    step(&mut scene, &mut effects, 140.0);
    assert_eq!(scene.position(id), Some(p(0.0, 300.0)));
}

// =============================================================
// PanLayer and FocusLayer
// =============================================================

#[test]
fn pan_keeps_the_grabbed_point_under_the_pointer() {
    let mut scene = Scene::new();
    let overlay = scene.next_plain_layer();
    let mut effects = EffectScheduler::new();
    effects.play(Box::new(PanLayer::new(0).with_dependents([overlay])));

    assert!(!pointer(&mut scene, &mut effects, drag(p(10.0, 10.0), p(30.0, 15.0), None)));
    assert!(pointer(&mut scene, &mut effects, drag(p(10.0, 10.0), p(40.0, 15.0), None)));
    assert_eq!(scene.layer_coefficients(0).expect("layer 0"), [1.0, 0.0, 0.0, 1.0, 10.0, 0.0]);
    assert_eq!(scene.layer_coefficients(overlay).expect("overlay"), [1.0, 0.0, 0.0, 1.0, 10.0, 0.0]);
    assert_eq!(scene.point_in_layer(p(40.0, 15.0), 0).expect("invertible"), p(30.0, 15.0));

    pointer(&mut scene, &mut effects, drag(p(10.0, 10.0), p(60.0, 35.0), None));
    assert_eq!(scene.point_in_layer(p(60.0, 35.0), 0).expect("invertible"), p(30.0, 15.0));
}

#[test]
fn pan_ignores_drags_that_grab_an_object() {
    let mut scene = Scene::new();
    let id = probe(&mut scene, 0.0, 0.0);
    let mut effects = EffectScheduler::new();
    effects.play(Box::new(PanLayer::new(0)));

    let contact = Contact { object: id, vector: Point::ORIGIN };
    assert!(!pointer(&mut scene, &mut effects, drag(p(0.0, 0.0), p(50.0, 0.0), Some(contact))));
    assert_eq!(scene.layer_coefficients(0).expect("layer 0"), Affine::IDENTITY.coefficients());
}

#[test]
fn pan_reanchors_after_release() {
    let mut scene = Scene::new();
    let mut effects = EffectScheduler::new();
    effects.play(Box::new(PanLayer::new(0)));

    pointer(&mut scene, &mut effects, drag_in(1, p(0.0, 0.0), p(10.0, 0.0), None));
    pointer(&mut scene, &mut effects, drag_in(1, p(0.0, 0.0), p(20.0, 0.0), None));
    pointer(&mut scene, &mut effects, PointerEvent::End(p(20.0, 0.0)));
    assert!(!pointer(&mut scene, &mut effects, drag_in(2, p(50.0, 0.0), p(55.0, 0.0), None)));
    pointer(&mut scene, &mut effects, drag_in(2, p(50.0, 0.0), p(65.0, 0.0), None));
    let [.., e, f] = scene.layer_coefficients(0).expect("layer 0");
    assert_eq!((e, f), (20.0, 0.0));
}

#[test]
fn pan_follows_only_the_newest_press() {
    let mut scene = Scene::new();
    let mut effects = EffectScheduler::new();
    effects.play(Box::new(PanLayer::new(0)));

    pointer(&mut scene, &mut effects, drag_in(1, p(0.0, 0.0), p(10.0, 0.0), None));
    assert!(!pointer(&mut scene, &mut effects, drag_in(2, p(100.0, 0.0), p(10.0, 0.0), None)));
    assert!(!pointer(&mut scene, &mut effects, drag_in(1, p(0.0, 0.0), p(20.0, 0.0), None)));
    assert!(pointer(&mut scene, &mut effects, drag_in(2, p(100.0, 0.0), p(20.0, 0.0), None)));
    assert_eq!(scene.layer_coefficients(0).expect("layer 0"), [1.0, 0.0, 0.0, 1.0, 10.0, 0.0]);
}

// =============================================================
// ShiftLayer
// =============================================================

#[test]
fn shift_moves_along_its_axis_only() {
    let mut scene = Scene::new();
    let mut effects = EffectScheduler::new();
    effects.play(Box::new(ShiftLayer::new(0, Axis::Horizontal)));

    assert!(!pointer(&mut scene, &mut effects, drag(p(0.0, 0.0), p(10.0, 10.0), None)));
    assert!(pointer(&mut scene, &mut effects, drag(p(0.0, 0.0), p(30.0, 25.0), None)));
    assert_eq!(scene.layer_coefficients(0).expect("layer 0"), [1.0, 0.0, 0.0, 1.0, 20.0, 0.0]);
    assert!(!pointer(&mut scene, &mut effects, drag(p(0.0, 0.0), p(30.0, 90.0), None)));
}

#[test]
fn shift_skips_presses_on_objects_above_its_layer() {
    let mut scene = Scene::new();
    probe(&mut scene, 0.0, 0.0);
    scene.next_layer();
    probe(&mut scene, 100.0, 100.0);
    let mut effects = EffectScheduler::new();
    effects.play(Box::new(ShiftLayer::new(0, Axis::Vertical)));

    pointer(&mut scene, &mut effects, drag_in(1, p(100.0, 100.0), p(100.0, 110.0), None));
    assert!(!pointer(&mut scene, &mut effects, drag_in(1, p(100.0, 100.0), p(100.0, 130.0), None)));
    assert_eq!(scene.layer_coefficients(0).expect("layer 0"), Affine::IDENTITY.coefficients());
    pointer(&mut scene, &mut effects, PointerEvent::End(p(100.0, 130.0)));

    pointer(&mut scene, &mut effects, drag_in(2, p(0.0, 0.0), p(0.0, 10.0), None));
    assert!(pointer(&mut scene, &mut effects, drag_in(2, p(0.0, 0.0), p(5.0, 40.0), None)));
    assert_eq!(scene.layer_coefficients(0).expect("layer 0"), [1.0, 0.0, 0.0, 1.0, 0.0, 30.0]);
}

#[test]
fn shift_hands_over_to_a_newer_press() {
    let mut scene = Scene::new();
    let mut effects = EffectScheduler::new();
    effects.play(Box::new(ShiftLayer::new(0, Axis::Horizontal)));

    pointer(&mut scene, &mut effects, drag_in(1, p(0.0, 0.0), p(0.0, 0.0), None));
    pointer(&mut scene, &mut effects, drag_in(2, p(100.0, 0.0), p(100.0, 0.0), None));
    assert!(!pointer(&mut scene, &mut effects, drag_in(1, p(0.0, 0.0), p(50.0, 0.0), None)));
    pointer(&mut scene, &mut effects, drag_in(2, p(100.0, 0.0), p(130.0, 0.0), None));
    let [.., e, f] = scene.layer_coefficients(0).expect("layer 0");
    assert_eq!((e, f), (30.0, 0.0));
}

#[test]
fn focus_eases_translation_and_keeps_scale() {
    let mut scene = Scene::new();
    scene.transform_layer(0, &Affine::scaling(2.0, 2.0)).expect("layer 0");
    let mut effects = EffectScheduler::new();
    let fx = effects.play(Box::new(FocusLayer::new(0, p(100.0, 50.0)).with_duration(100.0)));

    assert!(!step(&mut scene, &mut effects, 0.0));
    assert!(step(&mut scene, &mut effects, 40.0));
    let [.., e, _] = scene.layer_coefficients(0).expect("layer 0");
    assert!(e > 0.0 && e < 100.0);
    assert!(step(&mut scene, &mut effects, 100.0));
    assert_eq!(scene.layer_coefficients(0).expect("layer 0"), [2.0, 0.0, 0.0, 2.0, 100.0, 50.0]);
    assert!(!effects.is_playing(fx));
}

#[test]
fn focus_waits_while_its_layer_is_disabled() {
    let mut scene = Scene::new();
    scene.disable_layer(0).expect("layer 0");
    let mut effects = EffectScheduler::new();
    effects.play(Box::new(FocusLayer::new(0, p(100.0, 50.0)).with_duration(10.0)));

    step(&mut scene, &mut effects, 0.0);
    assert!(!step(&mut scene, &mut effects, 100.0));
    assert_eq!(effects.len(), 1);
}

// =============================================================
// CollisionWatch
// =============================================================

#[test]
fn collision_watch_handles_pairs_with_its_target() {
    let mut scene = Scene::new();
    let hero = probe(&mut scene, 0.0, 0.0);
    let coin = probe(&mut scene, 5.0, 0.0);
    let rock = probe(&mut scene, 5.0, 5.0);
    probe(&mut scene, 300.0, 300.0);
    let mut effects = EffectScheduler::new();
    let seen = Rc::new(Cell::new(0));
    let counter = Rc::clone(&seen);
    effects.play(Box::new(CollisionWatch::new(hero, move |other, scene: &mut Scene| {
        counter.set(counter.get() + 1);
        scene.remove(other)?;
        Ok(true)
    })));

    let pairs = scene.check_all_collisions();
    assert!(effects.dispatch(&SceneEvent::Collisions(&pairs), &mut scene).expect("dispatch"));
    assert_eq!(seen.get(), 2);
    assert!(!scene.contains(coin));
    assert!(!scene.contains(rock));
    assert!(scene.contains(hero));
}

#[test]
fn collision_watch_stops_when_target_is_removed() {
    let mut scene = Scene::new();
    let hero = probe(&mut scene, 0.0, 0.0);
    probe(&mut scene, 5.0, 0.0);
    probe(&mut scene, 0.0, 5.0);
    let mut effects = EffectScheduler::new();
    let seen = Rc::new(Cell::new(0));
    let counter = Rc::clone(&seen);
    effects.play(Box::new(CollisionWatch::new(hero, move |_other, scene: &mut Scene| {
        counter.set(counter.get() + 1);
        scene.remove(hero)?;
        Ok(true)
    })));

    let pairs = scene.check_all_collisions();
    effects.dispatch(&SceneEvent::Collisions(&pairs), &mut scene).expect("dispatch");
    assert_eq!(seen.get(), 1);
    assert!(effects.is_empty());
}

#[test]
fn collision_watch_ignores_other_events() {
    let mut scene = Scene::new();
    let hero = probe(&mut scene, 0.0, 0.0);
    probe(&mut scene, 5.0, 0.0);
    let mut effects = EffectScheduler::new();
    effects.play(Box::new(CollisionWatch::new(hero, |_other, _scene: &mut Scene| Ok(true))));
    assert!(effects.wants_collisions());
    assert!(!step(&mut scene, &mut effects, 0.0));
}

// =============================================================
// EffectSwitcher
// =============================================================

/// Counts the frames it sees; finishes on the first one when `once` is set.
struct Counter {
    frames: Rc<Cell<u32>>,
    once: bool,
}

fn counter(once: bool) -> (Box<dyn Effect>, Rc<Cell<u32>>) {
    let frames = Rc::new(Cell::new(0));
    (Box::new(Counter { frames: Rc::clone(&frames), once }), frames)
}

impl Effect for Counter {
    fn on_event(&mut self, event: &SceneEvent<'_>, _scene: &mut Scene) -> Result<Pulse, SceneError> {
        if !matches!(event, SceneEvent::Frame(_)) {
            return Ok(Pulse::Quiet);
        }
        self.frames.set(self.frames.get() + 1);
        Ok(if self.once { Pulse::Finish } else { Pulse::Quiet })
    }
}

#[test]
fn clicks_on_the_target_cycle_the_effects() {
    let mut scene = Scene::new();
    let id = probe(&mut scene, 0.0, 0.0);
    let (first, a) = counter(false);
    let (second, b) = counter(false);
    let mut effects = EffectScheduler::new();
    effects.play(Box::new(EffectSwitcher::new(id, Trigger::Click, vec![first, second])));

    step(&mut scene, &mut effects, 0.0);
    assert_eq!((a.get(), b.get()), (0, 0));

    let click = PointerEvent::Click(p(0.0, 0.0));
    for expected in [(1, 0), (1, 1), (2, 1)] {
        assert!(!pointer(&mut scene, &mut effects, click));
        step(&mut scene, &mut effects, 0.0);
        assert_eq!((a.get(), b.get()), expected);
    }

    pointer(&mut scene, &mut effects, PointerEvent::Click(p(300.0, 300.0)));
    pointer(&mut scene, &mut effects, PointerEvent::Start(p(0.0, 0.0)));
    step(&mut scene, &mut effects, 0.0);
    assert_eq!((a.get(), b.get()), (3, 1));
}

#[test]
fn lone_effect_toggles_and_can_start_running() {
    let mut scene = Scene::new();
    let id = probe(&mut scene, 0.0, 0.0);
    let (only, frames) = counter(false);
    let mut effects = EffectScheduler::new();
    effects.play(Box::new(EffectSwitcher::new(id, Trigger::Press, vec![only]).started()));

    step(&mut scene, &mut effects, 0.0);
    assert_eq!(frames.get(), 1);
    pointer(&mut scene, &mut effects, PointerEvent::Start(p(0.0, 0.0)));
    step(&mut scene, &mut effects, 0.0);
    assert_eq!(frames.get(), 1);
    pointer(&mut scene, &mut effects, PointerEvent::Start(p(5.0, 5.0)));
    step(&mut scene, &mut effects, 0.0);
    assert_eq!(frames.get(), 2);
}

#[test]
fn finished_effect_stays_finished() {
    let mut scene = Scene::new();
    let id = probe(&mut scene, 0.0, 0.0);
    let (once, first) = counter(true);
    let (other, second) = counter(false);
    let mut effects = EffectScheduler::new();
    effects.play(Box::new(EffectSwitcher::new(id, Trigger::Click, vec![once, other]).started()));

    step(&mut scene, &mut effects, 0.0);
    step(&mut scene, &mut effects, 0.0);
    assert_eq!(first.get(), 1);

    let click = PointerEvent::Click(p(0.0, 0.0));
    pointer(&mut scene, &mut effects, click);
    step(&mut scene, &mut effects, 0.0);
    pointer(&mut scene, &mut effects, click);
    step(&mut scene, &mut effects, 0.0);
    assert_eq!((first.get(), second.get()), (1, 1));
    assert_eq!(effects.len(), 1);
}
