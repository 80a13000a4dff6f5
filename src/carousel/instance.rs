//! Per-mount copies of the wheel model and the nodes the carousel drives.

use cgmath::{Array, Vector3};

use crate::{
    carousel::stabilizer,
    config::{CarouselConfig, Placement},
    data_structures::{
        instance::Instance,
        model::Material,
        scene_graph::{DisposeReport, NodeId, SceneGraph},
    },
    resources::texture::TextureHandle,
    stage::{InstanceId, Stage},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cabin {
    /// 1-based slot index.
    pub slot: usize,
    pub node: NodeId,
}

/// A clickable image face. Its destination is fixed when the panel is resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Panel {
    pub slot: usize,
    pub node: NodeId,
    destination: String,
}

impl Panel {
    pub fn new(slot: usize, node: NodeId, destination: &str) -> Self {
        Self {
            slot,
            node,
            destination: destination.to_string(),
        }
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }
}

/// The resolved nodes of one scene instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CarouselRig {
    pub root: NodeId,
    pub ring: Option<NodeId>,
    pub cabins: Vec<Cabin>,
    pub panels: Vec<Panel>,
}

impl CarouselRig {
    /// A rig for a graph where nothing could be resolved.
    pub fn empty(root: NodeId) -> Self {
        Self {
            root,
            ring: None,
            cabins: Vec::new(),
            panels: Vec::new(),
        }
    }

    pub fn cabin(&self, slot: usize) -> Option<&Cabin> {
        self.cabins.iter().find(|cabin| cabin.slot == slot)
    }

    pub fn panel(&self, slot: usize) -> Option<&Panel> {
        self.panels.iter().find(|panel| panel.slot == slot)
    }
}

/// A private copy of the model plus its rig. Nothing in here is shared with
/// the template or with other instances, except cached textures.
#[derive(Clone, Debug)]
pub struct SceneInstance {
    pub graph: SceneGraph,
    pub rig: CarouselRig,
}

fn placement_transform(placement: &Placement) -> Instance {
    Instance {
        position: placement.position.into(),
        scale: Vector3::from_value(placement.scale),
        ..Default::default()
    }
}

/// Clone `template` below a placement node and resolve the configured slots.
///
/// Unresolvable slots are logged and left out, so the rig may hold fewer
/// cabins or panels than configured. Panels start untextured.
pub fn instantiate(template: &SceneGraph, config: &CarouselConfig) -> SceneInstance {
    let mut graph = SceneGraph::new("carousel");
    let root = graph.root();
    graph.set_local_transform(root, placement_transform(&config.placement));
    graph.update_world_transforms();
    graph.graft(root, template);

    let ring = graph.find_by_name(&config.ring_node);
    if ring.is_none() {
        log::warn!(
            "Ring node '{}' not found in the model, the wheel will stand still.",
            config.ring_node
        );
    }

    let mut rig = CarouselRig {
        ring,
        ..CarouselRig::empty(root)
    };
    for (idx, slot) in config.slots.iter().enumerate() {
        let slot_no = idx + 1;
        let mut missing = Vec::new();

        match (graph.find_by_name(&slot.cabin_node), ring) {
            (Some(node), Some(ring)) if !graph.is_descendant_of(node, ring) => {
                log::warn!(
                    "Slot {}: cabin '{}' is not attached to the ring '{}', it will not be kept upright.",
                    slot_no,
                    slot.cabin_node,
                    config.ring_node
                );
            }
            (Some(node), _) => rig.cabins.push(Cabin { slot: slot_no, node }),
            (None, _) => missing.push(slot.cabin_node.as_str()),
        }

        match graph.find_by_name(&slot.panel_node) {
            Some(node) => {
                if let Some(scene_node) = graph.node_mut(node) {
                    scene_node.material = Some(Material::untextured(&slot.panel_node));
                }
                rig.panels.push(Panel::new(slot_no, node, &slot.destination));
            }
            None => missing.push(slot.panel_node.as_str()),
        }

        if !missing.is_empty() {
            log::warn!("Slot {}: no node named {:?} in the model.", slot_no, missing);
        }
    }

    stabilizer::settle(&mut graph, &rig);
    log::info!(
        "Instantiated carousel with {} of {} cabins and {} of {} panels.",
        rig.cabins.len(),
        config.slots.len(),
        rig.panels.len(),
        config.slots.len()
    );
    SceneInstance { graph, rig }
}

/// Give `panel` a material showing `texture`. The texture stays owned by its cache.
pub fn assign_texture(graph: &mut SceneGraph, panel: &Panel, texture: TextureHandle) {
    if let Some(node) = graph.node_mut(panel.node) {
        let name = node.name.clone();
        node.material = Some(Material::textured(&name, texture));
    }
}

/// Stop the frame updates of instance `id`, detach its graph from the stage
/// and free what the graph owns. `None` if nothing was attached.
pub fn release(stage: &mut Stage, id: InstanceId) -> Option<DisposeReport> {
    stage.unregister_frame_callback(id);
    let graph = stage.detach(id)?;
    Some(graph.dispose())
}
