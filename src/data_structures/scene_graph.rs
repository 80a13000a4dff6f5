//! Scene graph and hierarchical scene organization.
//!
//! Nodes live in an arena and refer to each other by [`NodeId`]. A parent is
//! always stored before its children, so world transforms can be refreshed
//! with a single forward pass (`world = parent_world * local`).
//!
//! Cloning a [`SceneGraph`] is a deep copy: node transforms, meshes and
//! materials are duplicated, GPU buffers are not (see [`Geometry`]). Textures
//! referenced by materials are shared handles owned by the texture cache.

use log::warn;

use crate::data_structures::{
    instance::Instance,
    model::{Geometry, Material},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug)]
pub struct SceneNode {
    pub name: String,
    pub geometry: Option<Geometry>,
    pub material: Option<Material>,
    local: Instance,
    world: Instance,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl SceneNode {
    fn new(name: &str, local: Instance, parent: Option<NodeId>) -> Self {
        Self {
            name: name.to_string(),
            geometry: None,
            material: None,
            local,
            world: local,
            parent,
            children: Vec::new(),
        }
    }

    pub fn local_transform(&self) -> &Instance {
        &self.local
    }

    /// World transform as of the last [`SceneGraph::update_world_transforms`].
    pub fn world_transform(&self) -> &Instance {
        &self.world
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// What [`SceneGraph::dispose`] released.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DisposeReport {
    pub nodes: usize,
    pub geometries: usize,
    pub materials: usize,
}

#[derive(Clone, Debug)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
}

impl SceneGraph {
    pub fn new(root_name: &str) -> Self {
        Self {
            nodes: vec![SceneNode::new(root_name, Instance::default(), None)],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id.0)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| (NodeId(idx), node))
    }

    /// Append an empty node below `parent`. Returns `None` if `parent` does not exist.
    pub fn add_child(&mut self, parent: NodeId, name: &str, local: Instance) -> Option<NodeId> {
        if parent.0 >= self.nodes.len() {
            warn!(
                "Cannot attach '{}' to node {} of a graph with {} nodes.",
                name,
                parent.0,
                self.nodes.len()
            );
            return None;
        }
        let id = NodeId(self.nodes.len());
        let parent_world = self.nodes[parent.0].world;
        let mut node = SceneNode::new(name, local, Some(parent));
        node.world = &parent_world * &local;
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        Some(id)
    }

    /// Copy all of `other` below `parent`. Returns the id `other`'s root got in `self`.
    pub fn graft(&mut self, parent: NodeId, other: &SceneGraph) -> Option<NodeId> {
        if parent.0 >= self.nodes.len() {
            return None;
        }
        let offset = self.nodes.len();
        let shift = |id: NodeId| NodeId(id.0 + offset);
        for (idx, node) in other.nodes.iter().enumerate() {
            let mut copy = node.clone();
            copy.parent = if idx == 0 {
                Some(parent)
            } else {
                node.parent.map(shift)
            };
            copy.children = node.children.iter().copied().map(shift).collect();
            self.nodes.push(copy);
        }
        let grafted_root = NodeId(offset);
        self.nodes[parent.0].children.push(grafted_root);
        self.update_world_transforms();
        Some(grafted_root)
    }

    /// First node called `name` in depth-first order below (and including) `start`.
    pub fn find_by_name_from(&self, start: NodeId, name: &str) -> Option<NodeId> {
        self.descendants(start)
            .into_iter()
            .find(|id| self.nodes[id.0].name == name)
    }

    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.find_by_name_from(self.root(), name)
    }

    /// `start` followed by all nodes below it, depth first.
    pub fn descendants(&self, start: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if start.0 >= self.nodes.len() {
            return out;
        }
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.nodes[id.0].children.iter().rev().copied());
        }
        out
    }

    pub fn is_descendant_of(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = self.node(node).and_then(SceneNode::parent);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes[id.0].parent;
        }
        false
    }

    pub fn get_local_transform(&self, id: NodeId) -> Option<Instance> {
        self.node(id).map(|node| node.local)
    }

    pub fn set_local_transform(&mut self, id: NodeId, instance: Instance) {
        if let Some(node) = self.node_mut(id) {
            node.local = instance;
        }
    }

    pub fn set_local_rotation(&mut self, id: NodeId, rotation: cgmath::Quaternion<f32>) {
        if let Some(node) = self.node_mut(id) {
            node.local.rotation = rotation;
        }
    }

    /// Cached world transform; see [`SceneGraph::update_world_transforms`].
    pub fn get_world_transform(&self, id: NodeId) -> Option<Instance> {
        self.node(id).map(|node| node.world)
    }

    /// World transform computed right now by accumulating every ancestor's
    /// local transform. Does not touch the cache.
    pub fn compute_world_transform(&self, id: NodeId) -> Option<Instance> {
        let node = self.node(id)?;
        let mut world = node.local;
        let mut current = node.parent;
        while let Some(parent) = current {
            let parent = &self.nodes[parent.0];
            world = &parent.local * &world;
            current = parent.parent;
        }
        Some(world)
    }

    /// Recompute every cached world transform from the local ones.
    pub fn update_world_transforms(&mut self) {
        for idx in 0..self.nodes.len() {
            let world = match self.nodes[idx].parent {
                Some(parent) => &self.nodes[parent.0].world * &self.nodes[idx].local,
                None => self.nodes[idx].local,
            };
            self.nodes[idx].world = world;
        }
    }

    /// Upload the meshes of every node that does not have GPU buffers yet.
    pub fn upload_meshes(&mut self, device: &wgpu::Device) {
        self.nodes
            .iter_mut()
            .filter_map(|node| node.geometry.as_mut())
            .for_each(|geometry| geometry.upload(device));
    }

    /// Free everything this graph exclusively owns: mesh buffers and materials.
    ///
    /// Textures referenced by materials are only released here if nothing
    /// else holds them; cached textures stay alive in their cache.
    pub fn dispose(mut self) -> DisposeReport {
        let mut report = DisposeReport {
            nodes: self.nodes.len(),
            ..Default::default()
        };
        for node in self.nodes.iter_mut() {
            if let Some(mut geometry) = node.geometry.take() {
                geometry.dispose();
                report.geometries += 1;
            }
            if node.material.take().is_some() {
                report.materials += 1;
            }
        }
        report
    }
}
