//! Geometry and materials attached to scene nodes.

use cgmath::Point3;
use wgpu::util::DeviceExt;

use crate::resources::texture::TextureHandle;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
}

/// CPU-side triangle mesh. Kept after upload because hit-testing runs on it.
#[derive(Clone, Debug, Default)]
pub struct Mesh {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub tex_coords: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl Mesh {
    /// An axis-aligned `width` x `height` rectangle centred on the origin in the
    /// XY plane, facing +Z, with UVs running top-left to bottom-right.
    pub fn quad(name: &str, width: f32, height: f32) -> Self {
        let (w, h) = (width / 2.0, height / 2.0);
        Self {
            name: name.to_string(),
            positions: vec![[-w, -h, 0.0], [w, -h, 0.0], [w, h, 0.0], [-w, h, 0.0]],
            tex_coords: vec![[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]],
            indices: vec![0, 1, 2, 0, 2, 3],
        }
    }

    /// Triangles in mesh-local space. Faces referencing missing vertices are skipped.
    pub fn triangles(&self) -> impl Iterator<Item = [Point3<f32>; 3]> + '_ {
        self.indices.chunks_exact(3).filter_map(|face| {
            let a = self.positions.get(face[0] as usize)?;
            let b = self.positions.get(face[1] as usize)?;
            let c = self.positions.get(face[2] as usize)?;
            Some([Point3::from(*a), Point3::from(*b), Point3::from(*c)])
        })
    }

    pub fn vertices(&self) -> Vec<ModelVertex> {
        self.positions
            .iter()
            .enumerate()
            .map(|(idx, position)| ModelVertex {
                position: *position,
                tex_coords: self.tex_coords.get(idx).copied().unwrap_or_default(),
            })
            .collect()
    }
}

/// Vertex and index buffers of one uploaded mesh.
#[derive(Debug)]
pub struct MeshBuffers {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
}

impl MeshBuffers {
    pub fn new(device: &wgpu::Device, mesh: &Mesh) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Vertex Buffer", mesh.name)),
            contents: bytemuck::cast_slice(&mesh.vertices()),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Index Buffer", mesh.name)),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex_buffer,
            index_buffer,
            num_elements: mesh.indices.len() as u32,
        }
    }

    pub fn destroy(&self) {
        self.vertex_buffer.destroy();
        self.index_buffer.destroy();
    }
}

/// A mesh plus the GPU buffers uploaded for it, if any.
///
/// Cloning copies the CPU data only: a clone never shares buffers with its
/// source, so each scene instance can free its own geometry.
#[derive(Debug, Default)]
pub struct Geometry {
    pub mesh: Mesh,
    pub buffers: Option<MeshBuffers>,
}

impl Geometry {
    pub fn new(mesh: Mesh) -> Self {
        Self {
            mesh,
            buffers: None,
        }
    }

    pub fn upload(&mut self, device: &wgpu::Device) {
        if self.buffers.is_none() {
            self.buffers = Some(MeshBuffers::new(device, &self.mesh));
        }
    }

    /// Frees the GPU buffers. The CPU mesh stays usable.
    pub fn dispose(&mut self) {
        if let Some(buffers) = self.buffers.take() {
            buffers.destroy();
        }
    }
}

impl Clone for Geometry {
    fn clone(&self) -> Self {
        Self::new(self.mesh.clone())
    }
}

/// Surface description of a node. A panel material wraps a cached texture;
/// the material belongs to the node, the texture belongs to the cache.
#[derive(Clone, Debug)]
pub struct Material {
    pub name: String,
    pub base_color: [f32; 4],
    pub diffuse: Option<TextureHandle>,
}

impl Material {
    pub fn untextured(name: &str) -> Self {
        Self {
            name: name.to_string(),
            base_color: [1.0, 1.0, 1.0, 1.0],
            diffuse: None,
        }
    }

    pub fn textured(name: &str, texture: TextureHandle) -> Self {
        Self {
            diffuse: Some(texture),
            ..Self::untextured(name)
        }
    }
}
