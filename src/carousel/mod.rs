//! The carousel: one wheel model mounted on a [`Stage`], spun every frame and
//! answering pointer events.
//!
//! A [`Carousel`] goes through `Idle -> Loading -> Live -> Disposed`. Model
//! loading is asynchronous and split in two halves so the host can run the
//! fetch wherever it likes:
//!
//! ```ignore
//! let ticket = carousel.begin_load(&mut stage)?;
//! let result = loader.load_model(ticket.path()).await;
//! carousel.finish_load(ticket, result, &mut loader, &mut stage).await;
//! ```
//!
//! Each ticket carries a generation. Disposing the carousel or starting
//! another load in between makes the ticket stale, and a stale result is
//! dropped instead of being attached.

use std::{rc::Rc, time::Duration};

use instant::Instant;
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, WindowEvent},
    window::CursorIcon,
};

use crate::{
    camera::CameraView,
    config::CarouselConfig,
    data_structures::scene_graph::{DisposeReport, SceneGraph},
    pick::{Hit, Navigator, PanelState, PointerLayer, PointerOutcome, hit_test},
    resources::loader::AssetLoader,
    stage::{InstanceId, Stage},
};

pub mod instance;
pub mod stabilizer;

use instance::{CarouselRig, SceneInstance, assign_texture, instantiate, release};
use stabilizer::{Spin, stabilize};

/// Permission to attach the result of one model load.
#[derive(Debug, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    path: String,
}

impl LoadTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

#[derive(Debug)]
enum MountState {
    Idle,
    Loading { generation: u64 },
    Live(CarouselRig),
    Disposed,
}

pub struct Carousel {
    id: InstanceId,
    config: CarouselConfig,
    model_path: String,
    view: CameraView,
    spin: Spin,
    state: MountState,
    generation: u64,
    pointer: PointerLayer,
}

impl Carousel {
    pub fn new(config: CarouselConfig, stage: &mut Stage, width: u32, height: u32) -> Self {
        let view = CameraView::from_config(&config.camera, width, height);
        let spin = Spin::from_config(&config.spin);
        let pointer = PointerLayer::new(Duration::from_millis(config.pointer.hover_interval_ms));
        Self {
            id: stage.allocate_id(),
            model_path: config.model_path.clone(),
            config,
            view,
            spin,
            state: MountState::Idle,
            generation: 0,
            pointer,
        }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn config(&self) -> &CarouselConfig {
        &self.config
    }

    pub fn model_path(&self) -> &str {
        &self.model_path
    }

    pub fn view(&self) -> &CameraView {
        &self.view
    }

    pub fn rig(&self) -> Option<&CarouselRig> {
        match &self.state {
            MountState::Live(rig) => Some(rig),
            _ => None,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self.state, MountState::Live(_))
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, MountState::Loading { .. })
    }

    pub fn is_disposed(&self) -> bool {
        matches!(self.state, MountState::Disposed)
    }

    pub fn panel_state(&self, slot: usize) -> PanelState {
        self.pointer.state(slot)
    }

    pub fn cursor(&self) -> CursorIcon {
        self.pointer.cursor()
    }

    pub fn pointer(&self) -> &PointerLayer {
        &self.pointer
    }

    /// Take down the mounted instance, if any. The carousel can load again afterwards.
    fn unmount(&mut self, stage: &mut Stage) -> Option<DisposeReport> {
        if !self.is_live() {
            return None;
        }
        self.state = MountState::Idle;
        self.pointer.reset(std::iter::empty());
        let report = release(stage, self.id);
        if let Some(report) = report {
            log::info!(
                "Unmounted {}: released {} nodes, {} geometries, {} materials.",
                self.model_path,
                report.nodes,
                report.geometries,
                report.materials
            );
        }
        report
    }

    /// Start loading the current model. Anything mounted is torn down first and
    /// any load already in flight becomes stale.
    pub fn begin_load(&mut self, stage: &mut Stage) -> Option<LoadTicket> {
        if self.is_disposed() {
            log::debug!(
                "Ignoring a load request for {}, the carousel is disposed.",
                self.model_path
            );
            return None;
        }
        self.unmount(stage);
        self.generation += 1;
        self.state = MountState::Loading {
            generation: self.generation,
        };
        Some(LoadTicket {
            generation: self.generation,
            path: self.model_path.clone(),
        })
    }

    fn accepts(&self, ticket: &LoadTicket) -> bool {
        matches!(self.state, MountState::Loading { generation } if generation == ticket.generation)
    }

    /// Mount the result of the load `ticket` was issued for.
    ///
    /// Returns `true` if the model is now live. A stale ticket or a failed
    /// load leaves the stage untouched.
    pub async fn finish_load(
        &mut self,
        ticket: LoadTicket,
        result: anyhow::Result<Rc<SceneGraph>>,
        loader: &mut AssetLoader,
        stage: &mut Stage,
    ) -> bool {
        if !self.accepts(&ticket) {
            log::info!(
                "Discarding model {} (load {}), the carousel moved on.",
                ticket.path,
                ticket.generation
            );
            return false;
        }
        let template = match result {
            Ok(template) => template,
            Err(e) => {
                log::error!(
                    "Model {} could not be loaded, the carousel stays empty: {:#}",
                    ticket.path,
                    e
                );
                self.state = MountState::Idle;
                return false;
            }
        };

        let SceneInstance { mut graph, rig } = instantiate(&template, &self.config);
        for panel in &rig.panels {
            let Some(slot) = self.config.slot(panel.slot) else {
                continue;
            };
            if let Some(texture) = loader.load_texture(&slot.image).await {
                assign_texture(&mut graph, panel, texture);
            }
        }

        if let Some(previous) = stage.attach(self.id, graph) {
            let report = previous.dispose();
            log::debug!("Freed the replaced root of {:?}: {:?}", self.id, report);
        }
        stage.register_frame_callback(self.id);
        self.pointer.reset(rig.panels.iter().map(|panel| panel.slot));
        self.state = MountState::Live(rig);
        true
    }

    /// Load and mount the current model in one go.
    pub async fn mount(&mut self, loader: &mut AssetLoader, stage: &mut Stage) -> bool {
        let Some(ticket) = self.begin_load(stage) else {
            return false;
        };
        let result = loader.load_model(ticket.path()).await;
        self.finish_load(ticket, result, loader, stage).await
    }

    /// Swap the wheel for the model at `path`.
    pub async fn set_model_path(
        &mut self,
        path: &str,
        loader: &mut AssetLoader,
        stage: &mut Stage,
    ) -> bool {
        if self.is_disposed() {
            return false;
        }
        self.model_path = path.to_string();
        self.mount(loader, stage).await
    }

    /// Tear the carousel down for good.
    ///
    /// Frame updates stop, the graph leaves the stage, its geometry and
    /// materials are freed. Cached textures are left to their cache. Returns
    /// `None` if the carousel was already disposed.
    pub fn dispose(&mut self, stage: &mut Stage) -> Option<DisposeReport> {
        if self.is_disposed() {
            log::debug!("Carousel for {} is already disposed.", self.model_path);
            return None;
        }
        let report = self.unmount(stage).unwrap_or_default();
        stage.unregister_frame_callback(self.id);
        self.state = MountState::Disposed;
        Some(report)
    }

    /// Per-frame update: spin the ring, keep the cabins upright, then run a
    /// hover test that was held back by the throttle.
    pub fn on_frame(&mut self, stage: &mut Stage, dt: Duration, now: Instant) -> PointerOutcome {
        let MountState::Live(rig) = &self.state else {
            return PointerOutcome::default();
        };
        if !stage.has_frame_callback(self.id) {
            return PointerOutcome::default();
        }
        if let Some(graph) = stage.graph_mut(self.id) {
            stabilize(graph, rig, &self.spin, dt);
        }
        match self.pointer.poll(now) {
            Some(position) => self.hover_at(stage, position),
            None => PointerOutcome::default(),
        }
    }

    /// The panel under `position`, if the carousel is live.
    pub fn hit_at(&self, stage: &Stage, position: PhysicalPosition<f64>) -> Option<Hit> {
        let MountState::Live(rig) = &self.state else {
            return None;
        };
        let graph = stage.graph(self.id)?;
        hit_test(&self.view, graph, &rig.panels, position)
    }

    fn hover_at(&mut self, stage: &Stage, position: PhysicalPosition<f64>) -> PointerOutcome {
        let hit = self.hit_at(stage, position);
        PointerOutcome {
            cursor: self.pointer.hover(hit),
            activated: None,
        }
    }

    pub fn on_pointer_move(
        &mut self,
        stage: &Stage,
        position: PhysicalPosition<f64>,
        now: Instant,
    ) -> PointerOutcome {
        match self.pointer.track(&self.view, position, now) {
            Some(position) => self.hover_at(stage, position),
            None => PointerOutcome::default(),
        }
    }

    pub fn on_pointer_leave(&mut self) -> PointerOutcome {
        PointerOutcome {
            cursor: self.pointer.leave(),
            activated: None,
        }
    }

    /// Activate the panel under `position` and navigate to its destination.
    /// A click that hits nothing does nothing.
    pub fn on_click(
        &mut self,
        stage: &Stage,
        position: PhysicalPosition<f64>,
        navigator: &mut dyn Navigator,
    ) -> PointerOutcome {
        let Some(hit) = self.hit_at(stage, position) else {
            return PointerOutcome::default();
        };
        let Some(destination) = self
            .rig()
            .and_then(|rig| rig.panel(hit.slot))
            .map(|panel| panel.destination().to_string())
        else {
            return PointerOutcome::default();
        };
        let cursor = self.pointer.activate(hit);
        log::info!("Panel {} activated, navigating to {}.", hit.slot, destination);
        navigator.navigate(&destination);
        PointerOutcome {
            cursor,
            activated: Some(hit.slot),
        }
    }

    /// Route a winit window event to the pointer layer.
    pub fn on_window_event(
        &mut self,
        stage: &Stage,
        event: &WindowEvent,
        now: Instant,
        navigator: &mut dyn Navigator,
    ) -> PointerOutcome {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.on_pointer_move(stage, *position, now)
            }
            WindowEvent::CursorLeft { .. } => self.on_pointer_leave(),
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => match self.pointer.last_position() {
                Some(position) => self.on_click(stage, position, navigator),
                None => PointerOutcome::default(),
            },
            WindowEvent::Resized(size) => {
                self.resize(size.width, size.height);
                PointerOutcome::default()
            }
            _ => PointerOutcome::default(),
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.view.resize(width, height);
    }
}
