use std::collections::HashMap;
use std::sync::Arc;

use crate::api::error::{EngineError, Result};
use crate::core::scene::Scene;

/// Registry of scene templates, keyed by name.
#[derive(Debug, Default)]
pub struct SceneManager {
    scenes: HashMap<String, Arc<Scene>>,
}

impl SceneManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a scene. Names are unique.
    pub fn add_scene(&mut self, scene: Scene) -> Result<Arc<Scene>> {
        if self.scenes.contains_key(&scene.name) {
            return Err(EngineError::DuplicateScene(scene.name));
        }
        let scene = Arc::new(scene);
        log::debug!("registered scene '{}'", scene.name);
        self.scenes.insert(scene.name.clone(), Arc::clone(&scene));
        Ok(scene)
    }

    pub fn get_scene(&self, name: &str) -> Result<Arc<Scene>> {
        self.scenes
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::SceneNotFound(name.to_string()))
    }

    /// Unregister a scene. A live instance of it keeps its own reference.
    pub fn remove_scene(&mut self, name: &str) -> Result<Arc<Scene>> {
        self.scenes
            .remove(name)
            .ok_or_else(|| EngineError::SceneNotFound(name.to_string()))
    }

    pub fn has_scene(&self, name: &str) -> bool {
        self.scenes.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.scenes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}
