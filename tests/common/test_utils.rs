use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    f32::consts::{FRAC_1_SQRT_2, PI},
    io::Cursor,
    rc::Rc,
};

use carousel_ngin::{
    camera::CameraView,
    config::{CarouselConfig, Placement, SpinConfig},
    data_structures::{
        instance::Instance,
        model::{Geometry, Mesh},
        scene_graph::{NodeId, SceneGraph},
        texture::GpuTexture,
    },
    pick::Navigator,
    resources::{
        AssetSource,
        loader::AssetLoader,
        texture::{TextureCache, TextureOptions, TextureUploader},
    },
};
use cgmath::{Deg, Point3, Quaternion, Rotation3, Vector3};
use futures::future::{FutureExt, LocalBoxFuture};
use winit::dpi::PhysicalPosition;

pub const SLOTS: usize = 10;
pub const WHEEL_RADIUS: f32 = 0.6;
pub const PANEL_WIDTH: f32 = 0.2;
pub const PANEL_HEIGHT: f32 = 0.15;
/// Panels sit this far in front of their cabin body.
pub const PANEL_OFFSET: f32 = 0.05;
pub const SURFACE: (u32, u32) = (800, 800);
pub const WHEEL_GLTF: &str = "models/wheel.gltf";

/// Cabin position in ring space. Cabins lie in the ring's XZ plane, around its spin axis.
pub fn cabin_position(slot: usize) -> Vector3<f32> {
    let angle = 2.0 * PI * (slot - 1) as f32 / SLOTS as f32;
    Vector3::new(WHEEL_RADIUS * angle.cos(), 0.0, WHEEL_RADIUS * angle.sin())
}

/// Tips the ring over so its local +Y spin axis points at the camera.
pub fn ring_tilt() -> Quaternion<f32> {
    Quaternion::from_angle_x(Deg(90.0))
}

fn with_quad(graph: &mut SceneGraph, node: NodeId, name: &str, width: f32, height: f32) {
    graph.node_mut(node).unwrap().geometry = Some(Geometry::new(Mesh::quad(name, width, height)));
}

/// A wheel built in code: a hub, a ring called `Cylinder`, and per slot a
/// cabin body `CubeNNN` carrying a panel `PanelNNN`.
pub fn wheel_template() -> SceneGraph {
    let mut graph = SceneGraph::new("wheel");
    let root = graph.root();
    let hub = graph.add_child(root, "Hub", Instance::default()).unwrap();
    with_quad(&mut graph, hub, "Hub", 0.3, 0.3);
    let ring = graph
        .add_child(root, "Cylinder", Instance::with_rotation(ring_tilt()))
        .unwrap();
    for slot in 1..=SLOTS {
        let cabin = graph
            .add_child(ring, &format!("Cube{slot:03}"), Instance::from(cabin_position(slot)))
            .unwrap();
        with_quad(&mut graph, cabin, "Body", 0.25, 0.25);
        let panel = graph
            .add_child(
                cabin,
                &format!("Panel{slot:03}"),
                Instance::from(Vector3::new(0.0, 0.0, PANEL_OFFSET)),
            )
            .unwrap();
        with_quad(&mut graph, panel, "Face", PANEL_WIDTH, PANEL_HEIGHT);
    }
    graph.update_world_transforms();
    graph
}

/// The reference deployment, placed at the origin and spun per frame.
pub fn test_config() -> CarouselConfig {
    CarouselConfig {
        model_path: WHEEL_GLTF.to_string(),
        spin: SpinConfig::per_frame(SpinConfig::REFERENCE_INCREMENT),
        placement: Placement {
            position: [0.0, 0.0, 0.0],
            scale: 1.0,
        },
        ..Default::default()
    }
}

/// The same wheel as [`wheel_template`] (minus the hub) as a `.gltf` file and
/// its external buffer. Every panel uses one shared quad mesh.
pub fn wheel_gltf() -> (String, Vec<u8>) {
    let quad = Mesh::quad("PanelQuad", PANEL_WIDTH, PANEL_HEIGHT);
    let mut bin = Vec::new();
    for position in &quad.positions {
        for component in position {
            bin.extend_from_slice(&component.to_le_bytes());
        }
    }
    let positions_len = bin.len();
    for index in &quad.indices {
        bin.extend_from_slice(&(*index as u16).to_le_bytes());
    }
    let indices_len = bin.len() - positions_len;

    let mut cabins = Vec::new();
    let mut nodes = Vec::new();
    for slot in 1..=SLOTS {
        let cabin_idx = 1 + 2 * (slot - 1);
        let p = cabin_position(slot);
        cabins.push(cabin_idx.to_string());
        nodes.push(format!(
            r#"{{"name":"Cube{slot:03}","translation":[{},{},{}],"children":[{}]}}"#,
            p.x,
            p.y,
            p.z,
            cabin_idx + 1
        ));
        nodes.push(format!(
            r#"{{"name":"Panel{slot:03}","translation":[0.0,0.0,{PANEL_OFFSET}],"mesh":0}}"#
        ));
    }
    let ring = format!(
        r#"{{"name":"Cylinder","rotation":[{FRAC_1_SQRT_2},0.0,0.0,{FRAC_1_SQRT_2}],"children":[{}]}}"#,
        cabins.join(",")
    );
    let (w, h) = (PANEL_WIDTH / 2.0, PANEL_HEIGHT / 2.0);
    let json = format!(
        r#"{{
  "asset": {{"version": "2.0"}},
  "scene": 0,
  "scenes": [{{"nodes": [0]}}],
  "nodes": [{ring},{nodes}],
  "meshes": [{{"name": "PanelQuad", "primitives": [{{"attributes": {{"POSITION": 0}}, "indices": 1}}]}}],
  "buffers": [{{"uri": "wheel.bin", "byteLength": {total}}}],
  "bufferViews": [
    {{"buffer": 0, "byteOffset": 0, "byteLength": {positions_len}, "target": 34962}},
    {{"buffer": 0, "byteOffset": {positions_len}, "byteLength": {indices_len}, "target": 34963}}
  ],
  "accessors": [
    {{"bufferView": 0, "componentType": 5126, "count": 4, "type": "VEC3", "min": [-{w}, -{h}, 0.0], "max": [{w}, {h}, 0.0]}},
    {{"bufferView": 1, "componentType": 5123, "count": 6, "type": "SCALAR"}}
  ]
}}"#,
        nodes = nodes.join(","),
        total = bin.len(),
    );
    (json, bin)
}

pub fn png_bytes(rgba: [u8; 4]) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(2, 2, image::Rgba(rgba));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

/// In-memory asset store that records every fetch.
#[derive(Clone, Default)]
pub struct MemoryAssetSource {
    files: Rc<RefCell<HashMap<String, Vec<u8>>>>,
    fetches: Rc<RefCell<Vec<String>>>,
}

impl MemoryAssetSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: &str, bytes: Vec<u8>) {
        self.files.borrow_mut().insert(path.to_string(), bytes);
    }

    pub fn remove(&self, path: &str) {
        self.files.borrow_mut().remove(path);
    }

    pub fn fetch_count(&self, path: &str) -> usize {
        self.fetches.borrow().iter().filter(|p| *p == path).count()
    }

    pub fn total_fetches(&self) -> usize {
        self.fetches.borrow().len()
    }
}

impl AssetSource for MemoryAssetSource {
    fn fetch<'a>(&'a self, path: &'a str) -> LocalBoxFuture<'a, anyhow::Result<Vec<u8>>> {
        async move {
            self.fetches.borrow_mut().push(path.to_string());
            self.files
                .borrow()
                .get(path)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("{path} does not exist"))
        }
        .boxed_local()
    }
}

/// The wheel model plus one image per reference slot.
pub fn standard_assets() -> MemoryAssetSource {
    let source = MemoryAssetSource::new();
    let (json, bin) = wheel_gltf();
    source.insert(WHEEL_GLTF, json.into_bytes());
    source.insert("models/wheel.bin", bin);
    for slot in 1..=SLOTS {
        source.insert(&format!("/p{slot}.jpg"), png_bytes([slot as u8 * 20, 0, 0, 255]));
    }
    source
}

#[derive(Clone, Debug, Default)]
pub struct GpuCounters {
    uploads: Rc<Cell<usize>>,
    destroyed: Rc<Cell<usize>>,
}

impl GpuCounters {
    pub fn uploads(&self) -> usize {
        self.uploads.get()
    }

    pub fn destroyed(&self) -> usize {
        self.destroyed.get()
    }
}

#[derive(Debug)]
pub struct FakeTexture {
    size: (u32, u32),
    destroyed: Rc<Cell<usize>>,
}

impl GpuTexture for FakeTexture {
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn destroy(&self) {
        self.destroyed.set(self.destroyed.get() + 1);
    }
}

/// Uploads nowhere, counts everything.
pub struct FakeUploader {
    counters: GpuCounters,
}

impl FakeUploader {
    pub fn new(counters: &GpuCounters) -> Self {
        Self {
            counters: counters.clone(),
        }
    }
}

impl TextureUploader for FakeUploader {
    fn upload(
        &self,
        _label: &str,
        image: &image::RgbaImage,
        _options: &TextureOptions,
    ) -> anyhow::Result<Box<dyn GpuTexture>> {
        self.counters.uploads.set(self.counters.uploads.get() + 1);
        Ok(Box::new(FakeTexture {
            size: image.dimensions(),
            destroyed: self.counters.destroyed.clone(),
        }))
    }
}

pub fn test_loader(source: &MemoryAssetSource, counters: &GpuCounters) -> AssetLoader {
    AssetLoader::new(
        Box::new(source.clone()),
        Box::new(FakeUploader::new(counters)),
        TextureCache::new(),
    )
}

#[derive(Debug, Default)]
pub struct RecordingNavigator {
    pub visited: Vec<String>,
}

impl Navigator for RecordingNavigator {
    fn navigate(&mut self, destination: &str) {
        self.visited.push(destination.to_string());
    }
}

/// World position of a node's origin.
pub fn world_origin(graph: &SceneGraph, node: NodeId) -> Point3<f32> {
    graph
        .get_world_transform(node)
        .unwrap()
        .transform_point(Point3::new(0.0, 0.0, 0.0))
}

/// Where the centre of `node` shows up on screen.
pub fn screen_position(
    view: &CameraView,
    graph: &SceneGraph,
    node: NodeId,
) -> PhysicalPosition<f64> {
    view.project(world_origin(graph, node)).unwrap()
}
