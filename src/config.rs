//! Static deployment configuration.
//!
//! Everything the carousel needs to know about its deployment lives in
//! [`CarouselConfig`]: which model to load, how its nodes are named, which
//! image and destination belong to which slot, and how fast the wheel turns.
//! `CarouselConfig::default()` is the reference deployment (ten cabins, every
//! panel linking to the product listing). Configurations can be loaded from
//! TOML; missing fields fall back to the reference values.

use std::{collections::HashSet, path::Path};

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};

use crate::resources::texture::TextureOptions;

/// Number of cabins on the reference wheel.
pub const REFERENCE_SLOTS: usize = 10;
/// Where every reference panel navigates to.
pub const PRODUCT_LISTING: &str = "/products/";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarouselConfig {
    pub model_path: String,
    /// Name of the node that spins.
    pub ring_node: String,
    /// Slot `i` (1-based) is `slots[i - 1]`.
    pub slots: Vec<SlotConfig>,
    pub spin: SpinConfig,
    pub pointer: PointerConfig,
    pub texture: TextureOptions,
    pub placement: Placement,
    pub camera: CameraConfig,
}

/// One cabin slot: the node names to resolve and what its panel shows and links to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlotConfig {
    pub cabin_node: String,
    pub panel_node: String,
    pub image: String,
    pub destination: String,
}

impl SlotConfig {
    /// The naming scheme of the reference asset: `Cube001`, `Panel001`, `/p1.jpg`.
    pub fn reference(slot: usize, destination: &str) -> Self {
        Self {
            cabin_node: format!("Cube{slot:03}"),
            panel_node: format!("Panel{slot:03}"),
            image: format!("/p{slot}.jpg"),
            destination: destination.to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpinMode {
    /// `rate` radians every frame; the wheel turns faster on faster displays.
    PerFrame,
    /// `rate` radians per second, scaled by the frame's delta time.
    #[default]
    PerSecond,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpinConfig {
    /// Rotation axis in the ring's local space.
    pub axis: [f32; 3],
    /// Radians per frame or per second, depending on `mode`. Negative turns clockwise.
    pub rate: f32,
    pub mode: SpinMode,
}

impl SpinConfig {
    /// Rotation applied by the reference wheel on every frame.
    pub const REFERENCE_INCREMENT: f32 = -0.003;

    /// The reference speed expressed independently of the refresh rate (60 Hz).
    pub fn reference() -> Self {
        Self {
            axis: [0.0, 1.0, 0.0],
            rate: Self::REFERENCE_INCREMENT * 60.0,
            mode: SpinMode::PerSecond,
        }
    }

    pub fn per_frame(rate: f32) -> Self {
        Self {
            rate,
            mode: SpinMode::PerFrame,
            ..Self::reference()
        }
    }
}

impl Default for SpinConfig {
    fn default() -> Self {
        Self::reference()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointerConfig {
    /// Minimum time between two hover ray tests. Clicks are never throttled.
    pub hover_interval_ms: u64,
}

impl Default for PointerConfig {
    fn default() -> Self {
        Self {
            hover_interval_ms: 16,
        }
    }
}

/// Where the wheel sits in the scene.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Placement {
    pub position: [f32; 3],
    pub scale: f32,
}

impl Default for Placement {
    fn default() -> Self {
        // group at [0.5, 1, 0] scaled 1.4 holding the wheel at [-1.2, 0.1, 0]
        Self {
            position: [0.5 - 1.2 * 1.4, 1.0 + 0.1 * 1.4, 0.0],
            scale: 1.4,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub yaw_deg: f32,
    pub pitch_deg: f32,
    pub fovy_deg: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        // looking down -Z from in front of the wheel
        Self {
            position: [0.0, 0.0, 2.5],
            yaw_deg: -90.0,
            pitch_deg: 0.0,
            fovy_deg: 75.0,
            znear: 0.1,
            zfar: 100.0,
        }
    }
}

impl Default for CarouselConfig {
    fn default() -> Self {
        Self {
            model_path: "ferris2.glb".to_string(),
            ring_node: "Cylinder".to_string(),
            slots: (1..=REFERENCE_SLOTS)
                .map(|slot| SlotConfig::reference(slot, PRODUCT_LISTING))
                .collect(),
            spin: SpinConfig::default(),
            pointer: PointerConfig::default(),
            texture: TextureOptions::default(),
            placement: Placement::default(),
            camera: CameraConfig::default(),
        }
    }
}

impl CarouselConfig {
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(content).context("invalid carousel configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("failed to load {}", path.display()))
    }

    /// Reject configurations the carousel cannot run with. Missing nodes in
    /// the asset are tolerated at load time; a broken table is not.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.ring_node.trim().is_empty() {
            bail!("ring_node must name a node");
        }
        if !self.spin.rate.is_finite() {
            bail!("spin.rate must be finite, got {}", self.spin.rate);
        }
        if self.spin.axis.iter().all(|c| *c == 0.0) {
            bail!("spin.axis must not be the zero vector");
        }
        let mut names = HashSet::new();
        for (idx, slot) in self.slots.iter().enumerate() {
            for name in [&slot.cabin_node, &slot.panel_node] {
                if !names.insert(name.as_str()) {
                    bail!("slot {} reuses node name '{}'", idx + 1, name);
                }
            }
        }
        Ok(())
    }

    pub fn slot(&self, slot: usize) -> Option<&SlotConfig> {
        slot.checked_sub(1).and_then(|idx| self.slots.get(idx))
    }
}
