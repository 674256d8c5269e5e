//! Scenes and the scene store interface

use serde::{Deserialize, Serialize};

/// A named snapshot of DMX channel intensities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    pub name: String,
    /// `(channel, value)` pairs in write order. Channels are 0-based.
    pub channel_values: Vec<(u16, u8)>,
}

impl Scene {
    pub fn new(name: impl Into<String>, channel_values: Vec<(u16, u8)>) -> Self {
        Self {
            name: name.into(),
            channel_values,
        }
    }

    /// Build a scene from a dense channel array, the way the console stores them.
    /// Values past the last addressable channel are dropped.
    pub fn from_dense(name: impl Into<String>, values: &[u8]) -> Self {
        Self {
            name: name.into(),
            channel_values: (0..=u16::MAX).zip(values.iter().copied()).collect(),
        }
    }
}

/// Lookup of scenes by name
pub trait SceneStore {
    fn find_scene_by_name(&self, name: &str) -> Option<&Scene>;
}

/// In-memory scene store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneLibrary {
    scenes: Vec<Scene>,
}

impl SceneLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a scene, replacing any scene with the same name
    pub fn insert(&mut self, scene: Scene) {
        match self.scenes.iter_mut().find(|s| s.name == scene.name) {
            Some(existing) => *existing = scene,
            None => self.scenes.push(scene),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Scene> {
        let index = self.scenes.iter().position(|s| s.name == name)?;
        Some(self.scenes.remove(index))
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}

impl FromIterator<Scene> for SceneLibrary {
    fn from_iter<I: IntoIterator<Item = Scene>>(iter: I) -> Self {
        let mut library = SceneLibrary::new();
        for scene in iter {
            library.insert(scene);
        }
        library
    }
}

impl SceneStore for SceneLibrary {
    fn find_scene_by_name(&self, name: &str) -> Option<&Scene> {
        self.scenes.iter().find(|scene| scene.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replaces_by_name() {
        let mut library = SceneLibrary::new();
        library.insert(Scene::new("Warm", vec![(0, 10)]));
        library.insert(Scene::new("Warm", vec![(0, 200)]));

        assert_eq!(library.len(), 1);
        assert_eq!(
            library.find_scene_by_name("Warm").unwrap().channel_values,
            vec![(0, 200)]
        );
        assert!(library.find_scene_by_name("Cold").is_none());
    }

    #[test]
    fn test_from_dense() {
        let scene = Scene::from_dense("Dense", &[1, 2, 3]);
        assert_eq!(scene.channel_values, vec![(0, 1), (1, 2), (2, 3)]);
    }

    #[test]
    fn test_from_dense_never_wraps_channels() {
        let values = vec![7; usize::from(u16::MAX) + 10];
        let scene = Scene::from_dense("Huge", &values);
        assert_eq!(scene.channel_values.len(), usize::from(u16::MAX) + 1);
        assert_eq!(scene.channel_values.last(), Some(&(u16::MAX, 7)));
    }
}
