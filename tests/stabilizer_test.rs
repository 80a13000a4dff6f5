mod common;

use std::time::Duration;

use carousel_ngin::{
    carousel::{
        instance::instantiate,
        stabilizer::{Spin, settle, stabilize},
    },
    config::{Placement, SlotConfig, SpinConfig, SpinMode},
    data_structures::instance::{Instance, angle_between},
};
use cgmath::{InnerSpace, One, Quaternion, Vector3};
use common::test_utils::*;

const FRAME: Duration = Duration::from_millis(16);

#[test]
fn cabins_stay_upright_for_a_thousand_frames() {
    let config = test_config();
    let mut instance = instantiate(&wheel_template(), &config);
    let rig = instance.rig.clone();
    assert_eq!(rig.cabins.len(), SLOTS);
    assert_eq!(rig.panels.len(), SLOTS);

    let ring = rig.ring.unwrap();
    let ring_start = instance.graph.get_local_transform(ring).unwrap().rotation;
    let start: Vec<Quaternion<f32>> = rig
        .cabins
        .iter()
        .map(|cabin| instance.graph.get_world_transform(cabin.node).unwrap().rotation)
        .collect();
    for rotation in &start {
        assert!(angle_between(*rotation, Quaternion::one()) < 1e-3);
    }

    let spin = Spin::from_config(&config.spin);
    for _ in 0..1000 {
        assert!(stabilize(&mut instance.graph, &rig, &spin, FRAME));
    }

    for (cabin, rotation) in rig.cabins.iter().zip(&start) {
        let now = instance.graph.get_world_transform(cabin.node).unwrap().rotation;
        let drift = angle_between(*rotation, now);
        assert!(drift < 1e-3, "cabin {} drifted by {} rad", cabin.slot, drift);
    }
    let ring_now = instance.graph.get_local_transform(ring).unwrap().rotation;
    let turned = angle_between(ring_start, ring_now);
    let expected = (1000.0 * SpinConfig::REFERENCE_INCREMENT).abs();
    assert!((turned - expected).abs() < 1e-3, "ring turned by {turned} rad");
}

#[test]
fn ring_strictly_advances_every_frame() {
    let config = test_config();
    let mut instance = instantiate(&wheel_template(), &config);
    let rig = instance.rig.clone();
    let ring = rig.ring.unwrap();
    let ring_start = instance.graph.get_local_transform(ring).unwrap().rotation;
    let spin = Spin::from_config(&config.spin);

    let mut previous = 0.0;
    for _ in 0..200 {
        stabilize(&mut instance.graph, &rig, &spin, FRAME);
        let turned = angle_between(
            ring_start,
            instance.graph.get_local_transform(ring).unwrap().rotation,
        );
        assert!(turned > previous);
        previous = turned;
    }
}

#[test]
fn cabins_orbit_while_staying_upright() {
    let config = test_config();
    let mut instance = instantiate(&wheel_template(), &config);
    let rig = instance.rig.clone();
    let cabin = rig.cabin(1).unwrap().node;
    let before = world_origin(&instance.graph, cabin);

    let spin = Spin::from_config(&config.spin);
    for _ in 0..500 {
        stabilize(&mut instance.graph, &rig, &spin, FRAME);
    }
    let after = world_origin(&instance.graph, cabin);
    assert!((after - before).magnitude() > 0.5);
    // the wheel turns in the plane facing the camera
    assert!(after.z.abs() < 1e-4);
    let rotation = instance.graph.get_world_transform(cabin).unwrap().rotation;
    assert!(angle_between(rotation, Quaternion::one()) < 1e-3);
}

#[test]
fn placement_scale_does_not_tilt_cabins() {
    let config = carousel_ngin::config::CarouselConfig {
        placement: Placement::default(),
        ..test_config()
    };
    let mut instance = instantiate(&wheel_template(), &config);
    let rig = instance.rig.clone();
    let spin = Spin::from_config(&config.spin);
    for _ in 0..300 {
        stabilize(&mut instance.graph, &rig, &spin, FRAME);
    }
    for cabin in &rig.cabins {
        let rotation = instance.graph.get_world_transform(cabin.node).unwrap().rotation;
        assert!(angle_between(rotation, Quaternion::one()) < 1e-3);
    }
}

#[test]
fn per_second_spin_follows_elapsed_time() {
    let mut config = test_config();
    config.spin = SpinConfig {
        rate: -0.18,
        mode: SpinMode::PerSecond,
        ..SpinConfig::reference()
    };
    let mut instance = instantiate(&wheel_template(), &config);
    let rig = instance.rig.clone();
    let ring = rig.ring.unwrap();
    let ring_start = instance.graph.get_local_transform(ring).unwrap().rotation;
    let spin = Spin::from_config(&config.spin);

    stabilize(&mut instance.graph, &rig, &spin, Duration::from_millis(500));
    stabilize(&mut instance.graph, &rig, &spin, Duration::from_millis(500));
    let turned = angle_between(
        ring_start,
        instance.graph.get_local_transform(ring).unwrap().rotation,
    );
    assert!((turned - 0.18).abs() < 1e-4);
}

#[test]
fn missing_ring_makes_the_frame_a_no_op() {
    let mut config = test_config();
    config.ring_node = "NoSuchRing".to_string();
    let mut instance = instantiate(&wheel_template(), &config);
    let rig = instance.rig.clone();
    assert!(rig.ring.is_none());
    assert_eq!(rig.cabins.len(), SLOTS);

    let before: Vec<Instance> = rig
        .cabins
        .iter()
        .map(|cabin| instance.graph.get_local_transform(cabin.node).unwrap())
        .collect();
    let spin = Spin::new(Vector3::unit_y(), -0.003, SpinMode::PerFrame);
    for _ in 0..10 {
        assert!(!stabilize(&mut instance.graph, &rig, &spin, FRAME));
    }
    assert!(!settle(&mut instance.graph, &rig));
    for (cabin, local) in rig.cabins.iter().zip(&before) {
        assert_eq!(instance.graph.get_local_transform(cabin.node).unwrap(), *local);
    }
}

#[test]
fn missing_slots_leave_the_rest_working() {
    let mut config = test_config();
    config.slots[2] = SlotConfig::reference(99, "/products/");
    config.slots[6].panel_node = "Nowhere".to_string();
    let mut instance = instantiate(&wheel_template(), &config);
    let rig = instance.rig.clone();
    assert_eq!(rig.cabins.len(), SLOTS - 1);
    assert_eq!(rig.panels.len(), SLOTS - 2);
    assert!(rig.cabin(3).is_none());
    assert!(rig.cabin(7).is_some());
    assert!(rig.panel(7).is_none());

    let spin = Spin::from_config(&config.spin);
    for _ in 0..100 {
        assert!(stabilize(&mut instance.graph, &rig, &spin, FRAME));
    }
    for cabin in &rig.cabins {
        let rotation = instance.graph.get_world_transform(cabin.node).unwrap().rotation;
        assert!(angle_between(rotation, Quaternion::one()) < 1e-3);
    }
}

#[test]
fn cabins_outside_the_ring_are_not_driven() {
    let mut template = wheel_template();
    let root = template.root();
    template
        .add_child(root, "Cube011", Instance::from(Vector3::new(2.0, 0.0, 0.0)))
        .unwrap();
    let mut config = test_config();
    config.slots.push(SlotConfig::reference(11, "/products/"));

    let instance = instantiate(&template, &config);
    assert_eq!(instance.rig.cabins.len(), SLOTS);
    assert!(instance.rig.cabin(11).is_none());
}

#[test]
fn instances_do_not_share_state() {
    let template = wheel_template();
    let config = test_config();
    let mut first = instantiate(&template, &config);
    let second = instantiate(&template, &config);
    let rig = first.rig.clone();
    let ring = rig.ring.unwrap();

    let spin = Spin::from_config(&config.spin);
    for _ in 0..50 {
        stabilize(&mut first.graph, &rig, &spin, FRAME);
    }
    let untouched = second.graph.get_local_transform(ring).unwrap().rotation;
    let template_ring = template.find_by_name("Cylinder").unwrap();
    assert_eq!(untouched, template.get_local_transform(template_ring).unwrap().rotation);
    let turned = first.graph.get_local_transform(ring).unwrap().rotation;
    assert!(angle_between(turned, untouched) > 0.1);
}
