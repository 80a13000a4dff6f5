//! Pointer hit-testing and panel selection.
//!
//! Picking runs on the CPU against the panels of a mounted carousel:
//! 1. The pointer position (pixels) is converted to normalized device coordinates
//! 2. The camera unprojects it into a world-space ray
//! 3. The ray is tested against the triangles of every panel (and the nodes below it)
//! 4. The nearest hit, if any, decides which panel is hovered or activated
//!
//! Only panels are ever tested, so a hit can never come from the ring, a
//! cabin body or anything else in the scene.

use std::{collections::BTreeMap, time::Duration};

use cgmath::{InnerSpace, Point3, Vector2};
use instant::Instant;
use winit::{dpi::PhysicalPosition, window::CursorIcon};

use crate::{
    camera::{CameraView, Ray},
    carousel::instance::Panel,
    data_structures::scene_graph::{NodeId, SceneGraph},
};

/// Receives the destination of an activated panel.
pub trait Navigator {
    fn navigate(&mut self, destination: &str);
}

/// Full page navigation through `window.location`.
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Default)]
pub struct LocationNavigator;

#[cfg(target_arch = "wasm32")]
impl Navigator for LocationNavigator {
    fn navigate(&mut self, destination: &str) {
        let Some(window) = web_sys::window() else {
            log::error!("No browser window to navigate to {}.", destination);
            return;
        };
        if let Err(e) = window.location().set_href(destination) {
            log::error!("Navigation to {} failed: {:?}", destination, e);
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PanelState {
    #[default]
    Idle,
    Hovered,
    Activated,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    pub slot: usize,
    pub node: NodeId,
    /// Distance from the ray origin, in world units.
    pub distance: f32,
}

/// Möller–Trumbore ray/triangle test. Both faces count as hits.
///
/// Returns the distance along the ray, if the triangle is in front of its origin.
pub fn intersect_triangle(ray: &Ray, triangle: &[Point3<f32>; 3]) -> Option<f32> {
    const EPSILON: f32 = 1e-8;
    let [a, b, c] = *triangle;
    let edge1 = b - a;
    let edge2 = c - a;
    let p = ray.direction.cross(edge2);
    let det = edge1.dot(p);
    if det.abs() < EPSILON {
        // parallel to the triangle plane
        return None;
    }
    let inv_det = 1.0 / det;
    let s = ray.origin - a;
    let u = s.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(edge1);
    let v = ray.direction.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let distance = edge2.dot(q) * inv_det;
    (distance > EPSILON).then_some(distance)
}

/// Nearest distance at which `ray` hits geometry at or below `node`.
fn intersect_subtree(graph: &SceneGraph, node: NodeId, ray: &Ray) -> Option<f32> {
    graph
        .descendants(node)
        .into_iter()
        .filter_map(|id| graph.node(id))
        .filter_map(|node| {
            let geometry = node.geometry.as_ref()?;
            let world = node.world_transform();
            geometry
                .mesh
                .triangles()
                .filter_map(|[a, b, c]| {
                    let triangle = [
                        world.transform_point(a),
                        world.transform_point(b),
                        world.transform_point(c),
                    ];
                    intersect_triangle(ray, &triangle)
                })
                .min_by(f32::total_cmp)
        })
        .min_by(f32::total_cmp)
}

/// The panel nearest to the ray origin that `ray` hits.
pub fn pick_panel(graph: &SceneGraph, panels: &[Panel], ray: &Ray) -> Option<Hit> {
    panels
        .iter()
        .filter_map(|panel| {
            intersect_subtree(graph, panel.node, ray).map(|distance| Hit {
                slot: panel.slot,
                node: panel.node,
                distance,
            })
        })
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
}

/// Hit test at a pixel position. A surface that has no size yet never hits.
pub fn hit_test(
    view: &CameraView,
    graph: &SceneGraph,
    panels: &[Panel],
    position: PhysicalPosition<f64>,
) -> Option<Hit> {
    let ray = view.ray_through_pixel(position)?;
    pick_panel(graph, panels, &ray)
}

/// Rate limiter for hover ray tests.
///
/// A move arriving within `interval` of the last processed one is parked;
/// a later move replaces it (latest wins) and [`PointerThrottle::poll`]
/// releases it once the interval has passed.
#[derive(Clone, Debug)]
pub struct PointerThrottle {
    interval: Duration,
    last_processed: Option<Instant>,
    pending: Option<PhysicalPosition<f64>>,
}

impl PointerThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_processed: None,
            pending: None,
        }
    }

    fn is_due(&self, now: Instant) -> bool {
        match self.last_processed {
            Some(last) => now >= last + self.interval,
            None => true,
        }
    }

    /// Returns the position to test right away, or `None` if it was parked.
    pub fn offer(
        &mut self,
        position: PhysicalPosition<f64>,
        now: Instant,
    ) -> Option<PhysicalPosition<f64>> {
        if self.is_due(now) {
            self.last_processed = Some(now);
            self.pending = None;
            Some(position)
        } else {
            self.pending = Some(position);
            None
        }
    }

    /// The parked position, once it may be tested.
    pub fn poll(&mut self, now: Instant) -> Option<PhysicalPosition<f64>> {
        if self.pending.is_none() || !self.is_due(now) {
            return None;
        }
        self.last_processed = Some(now);
        self.pending.take()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn clear(&mut self) {
        self.pending = None;
    }
}

/// What the host should do after a pointer event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PointerOutcome {
    /// Set when the cursor has to change.
    pub cursor: Option<CursorIcon>,
    /// Slot of the panel a click activated.
    pub activated: Option<usize>,
}

/// Per-panel interaction state, the cursor and the last pointer position.
#[derive(Clone, Debug)]
pub struct PointerLayer {
    states: BTreeMap<usize, PanelState>,
    hovered: Option<usize>,
    cursor: CursorIcon,
    last_position: Option<PhysicalPosition<f64>>,
    last_ndc: Option<Vector2<f32>>,
    throttle: PointerThrottle,
}

impl PointerLayer {
    pub fn new(hover_interval: Duration) -> Self {
        Self {
            states: BTreeMap::new(),
            hovered: None,
            cursor: CursorIcon::Default,
            last_position: None,
            last_ndc: None,
            throttle: PointerThrottle::new(hover_interval),
        }
    }

    /// Start over with every given slot idle.
    pub fn reset(&mut self, slots: impl IntoIterator<Item = usize>) {
        self.states = slots.into_iter().map(|slot| (slot, PanelState::Idle)).collect();
        self.hovered = None;
        self.cursor = CursorIcon::Default;
        self.throttle.clear();
    }

    pub fn state(&self, slot: usize) -> PanelState {
        self.states.get(&slot).copied().unwrap_or_default()
    }

    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    pub fn cursor(&self) -> CursorIcon {
        self.cursor
    }

    pub fn last_position(&self) -> Option<PhysicalPosition<f64>> {
        self.last_position
    }

    pub fn last_ndc(&self) -> Option<Vector2<f32>> {
        self.last_ndc
    }

    /// Remember where the pointer is and whether its hover test may run now.
    pub fn track(
        &mut self,
        view: &CameraView,
        position: PhysicalPosition<f64>,
        now: Instant,
    ) -> Option<PhysicalPosition<f64>> {
        self.last_position = Some(position);
        self.last_ndc = view.pixel_to_ndc(position);
        self.throttle.offer(position, now)
    }

    pub fn poll(&mut self, now: Instant) -> Option<PhysicalPosition<f64>> {
        self.throttle.poll(now)
    }

    fn set_cursor(&mut self, cursor: CursorIcon) -> Option<CursorIcon> {
        (self.cursor != cursor).then(|| {
            self.cursor = cursor;
            cursor
        })
    }

    /// Apply a hover test result. Returns the new cursor if it changed.
    pub fn hover(&mut self, hit: Option<Hit>) -> Option<CursorIcon> {
        let hovered = hit.map(|hit| hit.slot);
        for (slot, state) in self.states.iter_mut() {
            *state = if Some(*slot) == hovered {
                PanelState::Hovered
            } else {
                PanelState::Idle
            };
        }
        self.hovered = hovered;
        self.set_cursor(match hovered {
            Some(_) => CursorIcon::Pointer,
            None => CursorIcon::Default,
        })
    }

    /// Mark the hit panel activated; it stays under the pointer.
    pub fn activate(&mut self, hit: Hit) -> Option<CursorIcon> {
        let cursor = self.hover(Some(hit));
        self.states.insert(hit.slot, PanelState::Activated);
        cursor
    }

    /// The pointer left the surface: nothing is hovered any more.
    pub fn leave(&mut self) -> Option<CursorIcon> {
        self.last_position = None;
        self.last_ndc = None;
        self.throttle.clear();
        self.hover(None)
    }
}
