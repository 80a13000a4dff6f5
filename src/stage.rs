//! The render graph the host draws from and the frame registrations.
//!
//! Each mounted carousel attaches exactly one scene graph under its
//! [`InstanceId`] and registers for frame updates. The host renders whatever
//! is attached; anything detached is unreachable for rendering.
//!
//! # Lifecycle per frame
//!
//! 1. The host delivers pending pointer events to the carousels
//! 2. Every registered carousel runs its frame update (`Carousel::on_frame`)
//! 3. The host collects [`Stage::draw_list`] and renders
//!
//! Steps 2 and 3 never interleave, so a frame with a rotated ring but
//! uncorrected cabins is never drawn.

use std::collections::{BTreeMap, BTreeSet};

use crate::data_structures::{
    instance::InstanceRaw,
    model::{Geometry, Material},
    scene_graph::{NodeId, SceneGraph},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

/// One drawable node, as handed to the host renderer.
pub struct DrawItem<'a> {
    pub instance: InstanceId,
    pub node: NodeId,
    pub transform: InstanceRaw,
    pub geometry: &'a Geometry,
    pub material: Option<&'a Material>,
}

#[derive(Debug, Default)]
pub struct Stage {
    graphs: BTreeMap<InstanceId, SceneGraph>,
    frame_callbacks: BTreeSet<InstanceId>,
    next_id: u64,
}

impl Stage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate_id(&mut self) -> InstanceId {
        let id = InstanceId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Attach `graph` as the root of instance `id`. An instance has at most
    /// one root; attaching again replaces (and returns) the previous one.
    pub fn attach(&mut self, id: InstanceId, graph: SceneGraph) -> Option<SceneGraph> {
        let previous = self.graphs.insert(id, graph);
        if previous.is_some() {
            log::warn!("Instance {:?} attached a second root, the first one was detached.", id);
        }
        previous
    }

    pub fn detach(&mut self, id: InstanceId) -> Option<SceneGraph> {
        self.graphs.remove(&id)
    }

    pub fn is_attached(&self, id: InstanceId) -> bool {
        self.graphs.contains_key(&id)
    }

    pub fn graph(&self, id: InstanceId) -> Option<&SceneGraph> {
        self.graphs.get(&id)
    }

    pub fn graph_mut(&mut self, id: InstanceId) -> Option<&mut SceneGraph> {
        self.graphs.get_mut(&id)
    }

    pub fn attached(&self) -> impl Iterator<Item = (InstanceId, &SceneGraph)> {
        self.graphs.iter().map(|(id, graph)| (*id, graph))
    }

    /// Total number of nodes reachable for rendering.
    pub fn node_count(&self) -> usize {
        self.graphs.values().map(SceneGraph::len).sum()
    }

    pub fn register_frame_callback(&mut self, id: InstanceId) -> bool {
        self.frame_callbacks.insert(id)
    }

    pub fn unregister_frame_callback(&mut self, id: InstanceId) -> bool {
        self.frame_callbacks.remove(&id)
    }

    pub fn has_frame_callback(&self, id: InstanceId) -> bool {
        self.frame_callbacks.contains(&id)
    }

    pub fn upload_meshes(&mut self, device: &wgpu::Device) {
        self.graphs
            .values_mut()
            .for_each(|graph| graph.upload_meshes(device));
    }

    /// Every node with geometry in every attached graph, with its current world transform.
    pub fn draw_list(&self) -> Vec<DrawItem<'_>> {
        self.graphs
            .iter()
            .flat_map(|(id, graph)| {
                graph.nodes().filter_map(move |(node_id, node)| {
                    let geometry = node.geometry.as_ref()?;
                    Some(DrawItem {
                        instance: *id,
                        node: node_id,
                        transform: node.world_transform().to_raw(),
                        geometry,
                        material: node.material.as_ref(),
                    })
                })
            })
            .collect()
    }
}
