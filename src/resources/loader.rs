//! The asset loader: one memo for model templates, one [`TextureCache`] for panel images.

use std::{collections::HashMap, rc::Rc};

use anyhow::Context;

use crate::{
    data_structures::{scene_graph::SceneGraph, texture::GpuTexture},
    resources::{
        AssetSource, load_scene_gltf,
        texture::{TextureCache, TextureHandle, TextureOptions, TextureUploader},
    },
};

/// Loads model templates and panel textures, each path at most once.
///
/// The loader owns the texture cache it was given; the cache lives as long as
/// the loader unless [`AssetLoader::dispose_all`] is called.
pub struct AssetLoader {
    source: Box<dyn AssetSource>,
    uploader: Box<dyn TextureUploader>,
    textures: TextureCache,
    models: HashMap<String, Rc<SceneGraph>>,
    options: TextureOptions,
}

impl AssetLoader {
    pub fn new(
        source: Box<dyn AssetSource>,
        uploader: Box<dyn TextureUploader>,
        textures: TextureCache,
    ) -> Self {
        Self {
            source,
            uploader,
            textures,
            models: HashMap::new(),
            options: TextureOptions::default(),
        }
    }

    pub fn with_texture_options(mut self, options: TextureOptions) -> Self {
        self.options = options;
        self
    }

    pub fn textures(&self) -> &TextureCache {
        &self.textures
    }

    pub fn is_model_loaded(&self, path: &str) -> bool {
        self.models.contains_key(path)
    }

    /// The parsed template for `path`. Templates are never handed out
    /// mutably; every mount clones its own copy.
    pub async fn load_model(&mut self, path: &str) -> anyhow::Result<Rc<SceneGraph>> {
        if let Some(template) = self.models.get(path) {
            return Ok(template.clone());
        }
        let template = Rc::new(load_scene_gltf(self.source.as_ref(), path).await?);
        log::info!("Loaded model {} with {} nodes.", path, template.len());
        self.models.insert(path.to_string(), template.clone());
        Ok(template)
    }

    /// The cached texture for `path`, loading and uploading it on first use.
    ///
    /// Failures are logged and yield `None`; they are not cached, a later
    /// request tries again.
    pub async fn load_texture(&mut self, path: &str) -> Option<TextureHandle> {
        if let Some(handle) = self.textures.get(path) {
            return Some(handle);
        }
        match self.fetch_texture(path).await {
            Ok(gpu) => Some(self.textures.insert(path, gpu)),
            Err(e) => {
                log::error!(
                    "Texture {} could not be loaded, the panel stays untextured: {:#}",
                    path,
                    e
                );
                None
            }
        }
    }

    async fn fetch_texture(&self, path: &str) -> anyhow::Result<Box<dyn GpuTexture>> {
        let bytes = self.source.fetch(path).await?;
        let image = self.options.prepare(&bytes, path)?;
        self.uploader
            .upload(path, &image, &self.options)
            .with_context(|| format!("could not upload {path}"))
    }

    /// Release every cached texture and forget every template. Only for
    /// tearing the whole feature down, never for a single unmount.
    pub fn dispose_all(&mut self) -> usize {
        self.models.clear();
        let released = self.textures.dispose_all();
        log::info!("Released {} cached textures.", released);
        released
    }
}
