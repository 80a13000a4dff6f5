//! Keeps the cabins upright while the ring turns.
//!
//! Every frame the ring is advanced about its spin axis, then each cabin's
//! local rotation is set to the inverse of its parent's world rotation. The
//! cabin's world rotation is therefore the identity at all times, no matter
//! how far the ring has turned.

use std::time::Duration;

use cgmath::{InnerSpace, Quaternion, Rad, Rotation3, Vector3};

use crate::{
    carousel::instance::CarouselRig,
    config::{SpinConfig, SpinMode},
    data_structures::scene_graph::SceneGraph,
};

/// The ring's rotation per frame or per second.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Spin {
    axis: Vector3<f32>,
    rate: f32,
    mode: SpinMode,
}

impl Spin {
    pub fn new(axis: Vector3<f32>, rate: f32, mode: SpinMode) -> Self {
        let axis = if axis.magnitude2() > f32::EPSILON {
            axis.normalize()
        } else {
            log::warn!("Spin axis {:?} has no direction, spinning about +Y instead.", axis);
            Vector3::unit_y()
        };
        Self { axis, rate, mode }
    }

    pub fn from_config(config: &SpinConfig) -> Self {
        Self::new(config.axis.into(), config.rate, config.mode)
    }

    pub fn axis(&self) -> Vector3<f32> {
        self.axis
    }

    /// How far the ring turns in a frame that took `dt`.
    pub fn step_angle(&self, dt: Duration) -> Rad<f32> {
        match self.mode {
            SpinMode::PerFrame => Rad(self.rate),
            SpinMode::PerSecond => Rad(self.rate * dt.as_secs_f32()),
        }
    }
}

/// Cancel the parent rotation of every cabin.
fn counter_rotate(graph: &mut SceneGraph, rig: &CarouselRig) {
    for cabin in &rig.cabins {
        let Some(parent) = graph.node(cabin.node).and_then(|node| node.parent()) else {
            continue;
        };
        let Some(parent_world) = graph.compute_world_transform(parent) else {
            continue;
        };
        graph.set_local_rotation(cabin.node, parent_world.rotation.normalize().conjugate());
    }
}

/// Advance the ring by one frame and counter-rotate the cabins.
///
/// Returns `false` (and touches nothing) if the rig has no ring.
pub fn stabilize(graph: &mut SceneGraph, rig: &CarouselRig, spin: &Spin, dt: Duration) -> bool {
    let Some(ring) = rig.ring else {
        return false;
    };
    let Some(mut local) = graph.get_local_transform(ring) else {
        return false;
    };
    let step = Quaternion::from_axis_angle(spin.axis, spin.step_angle(dt));
    local.rotation = (local.rotation * step).normalize();
    graph.set_local_transform(ring, local);
    counter_rotate(graph, rig);
    graph.update_world_transforms();
    true
}

/// Counter-rotate the cabins without advancing the ring, so the very first
/// frame is already upright.
pub fn settle(graph: &mut SceneGraph, rig: &CarouselRig) -> bool {
    if rig.ring.is_none() {
        return false;
    }
    counter_rotate(graph, rig);
    graph.update_world_transforms();
    true
}
