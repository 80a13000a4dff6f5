use anyhow::{Context, bail};
use cgmath::Quaternion;
use futures::future::{FutureExt, LocalBoxFuture};

use crate::data_structures::{
    instance::Instance,
    model::{Geometry, Material, Mesh},
    scene_graph::{NodeId, SceneGraph},
};

/**
 * This module contains all logic for loading the wheel model and the panel
 * images from wherever the host keeps its assets.
 */
pub mod loader;
pub mod texture;

/// Where asset bytes come from: the local asset folder natively, the page
/// origin in the browser, or anything a test wants to count.
pub trait AssetSource {
    fn fetch<'a>(&'a self, path: &'a str) -> LocalBoxFuture<'a, anyhow::Result<Vec<u8>>>;
}

/// Reads assets below a root directory (`./assets` by default).
#[cfg(not(target_arch = "wasm32"))]
pub struct FsAssetSource {
    root: std::path::PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl FsAssetSource {
    pub fn new(root: impl Into<std::path::PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Asset paths are URL-like (`/p1.jpg`); they are always resolved below the root.
    pub fn resolve(&self, path: &str) -> std::path::PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Default for FsAssetSource {
    fn default() -> Self {
        Self::new("./assets")
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl AssetSource for FsAssetSource {
    fn fetch<'a>(&'a self, path: &'a str) -> LocalBoxFuture<'a, anyhow::Result<Vec<u8>>> {
        let full_path = self.resolve(path);
        async move {
            tokio::fs::read(&full_path)
                .await
                .with_context(|| format!("could not read {}", full_path.display()))
        }
        .boxed_local()
    }
}

/// Fetches assets relative to the origin of the page the carousel runs in.
#[cfg(target_arch = "wasm32")]
pub struct HttpAssetSource {
    base: reqwest::Url,
}

#[cfg(target_arch = "wasm32")]
impl HttpAssetSource {
    pub fn from_origin() -> anyhow::Result<Self> {
        let window = web_sys::window().context("no browser window")?;
        let origin = window
            .location()
            .origin()
            .map_err(|e| anyhow::anyhow!("could not read the page origin: {:?}", e))?;
        let base = reqwest::Url::parse(&format!("{}/", origin))?;
        Ok(Self { base })
    }
}

#[cfg(target_arch = "wasm32")]
impl AssetSource for HttpAssetSource {
    fn fetch<'a>(&'a self, path: &'a str) -> LocalBoxFuture<'a, anyhow::Result<Vec<u8>>> {
        async move {
            let url = self.base.join(path.trim_start_matches('/'))?;
            let bytes = reqwest::get(url.clone())
                .await?
                .error_for_status()
                .with_context(|| format!("could not fetch {url}"))?
                .bytes()
                .await?;
            Ok(bytes.to_vec())
        }
        .boxed_local()
    }
}

/// Resolve a URI found inside `file_name` relative to that file's directory.
fn sibling_path(file_name: &str, uri: &str) -> String {
    match file_name.rfind('/') {
        Some(idx) => format!("{}{}", &file_name[..=idx], uri),
        None => uri.to_string(),
    }
}

/// Fetch and parse a `.glb`/`.gltf` file into a scene graph template.
///
/// Only what the carousel needs is kept: node names, TRS transforms, triangle
/// meshes (positions, first UV set, indices) and base colours. Embedded images
/// are ignored, panel imagery comes from the slot configuration.
pub async fn load_scene_gltf(
    source: &dyn AssetSource,
    file_name: &str,
) -> anyhow::Result<SceneGraph> {
    let gltf_bytes = source.fetch(file_name).await?;
    let gltf = gltf::Gltf::from_slice(&gltf_bytes)
        .with_context(|| format!("{file_name} is not a valid glTF asset"))?;

    // Load buffers
    let mut buffer_data: Vec<Vec<u8>> = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => match gltf.blob.as_deref() {
                Some(blob) => buffer_data.push(blob.to_vec()),
                None => bail!("{file_name} references a binary chunk it does not contain"),
            },
            gltf::buffer::Source::Uri(uri) if uri.starts_with("data:") => {
                bail!("{file_name}: embedded data URIs are not supported, export as .glb")
            }
            gltf::buffer::Source::Uri(uri) => {
                let bin = source.fetch(&sibling_path(file_name, uri)).await?;
                buffer_data.push(bin);
            }
        }
    }

    let materials: Vec<Material> = gltf
        .materials()
        .enumerate()
        .map(|(idx, material)| {
            let name = material
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("material{idx}"));
            Material {
                base_color: material.pbr_metallic_roughness().base_color_factor(),
                ..Material::untextured(&name)
            }
        })
        .collect();

    let scene = gltf
        .default_scene()
        .or_else(|| gltf.scenes().next())
        .with_context(|| format!("{file_name} contains no scene"))?;

    let mut graph = SceneGraph::new(file_name);
    let root = graph.root();
    for node in scene.nodes() {
        add_gltf_node(&mut graph, root, node, &buffer_data, &materials);
    }
    graph.update_world_transforms();
    Ok(graph)
}

fn add_gltf_node(
    graph: &mut SceneGraph,
    parent: NodeId,
    node: gltf::Node,
    buffers: &[Vec<u8>],
    materials: &[Material],
) {
    let (translation, rotation, scale) = node.transform().decomposed();
    let local = Instance {
        position: translation.into(),
        // glTF stores quaternions as [x, y, z, w]
        rotation: Quaternion::new(rotation[3], rotation[0], rotation[1], rotation[2]),
        scale: scale.into(),
    };
    let name = node
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("node{}", node.index()));
    let Some(id) = graph.add_child(parent, &name, local) else {
        return;
    };

    if let Some(mesh) = node.mesh() {
        let mut merged = Mesh {
            name: mesh.name().unwrap_or(&name).to_string(),
            ..Default::default()
        };
        let mut material = None;
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::warn!(
                    "Skipping a {:?} primitive of mesh '{}', only triangles are supported.",
                    primitive.mode(),
                    merged.name
                );
                continue;
            }
            let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));
            let Some(positions) = reader.read_positions() else {
                continue;
            };
            let base = merged.positions.len() as u32;
            merged.positions.extend(positions);
            let added = merged.positions.len() as u32 - base;
            match reader.read_tex_coords(0) {
                Some(tex_coords) => merged.tex_coords.extend(tex_coords.into_f32()),
                None => merged
                    .tex_coords
                    .extend((0..added).map(|_| [0.0f32, 0.0])),
            }
            match reader.read_indices() {
                Some(indices) => merged
                    .indices
                    .extend(indices.into_u32().map(|idx| idx + base)),
                None => merged.indices.extend(base..base + added),
            }
            if material.is_none() {
                material = primitive
                    .material()
                    .index()
                    .and_then(|idx| materials.get(idx))
                    .cloned();
            }
        }
        if let Some(scene_node) = graph.node_mut(id) {
            scene_node.geometry = Some(Geometry::new(merged));
            scene_node.material = material;
        }
    }

    for child in node.children() {
        add_gltf_node(graph, id, child, buffers, materials);
    }
}
