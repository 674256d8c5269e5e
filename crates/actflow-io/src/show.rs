//! Show I/O - High-level API
//!
//! A [`Show`] is everything a console needs to play: the acts, the scene
//! library and the fixture patch. Saving wraps it in a versioned
//! [`ShowFile`]; loading checks the version and drops any playback state that
//! was persisted with the acts.

use crate::error::{IoError, Result};
use crate::show_format::{ShowFile, SHOW_FILE_VERSION};
use actflow_control::{DmxUniverse, Fixture};
use actflow_core::{Act, ActId, SceneLibrary};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Acts, scenes and patch of one show
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Show {
    pub name: String,
    #[serde(default)]
    pub acts: Vec<Act>,
    #[serde(default)]
    pub scenes: SceneLibrary,
    #[serde(default)]
    pub fixtures: Vec<Fixture>,
    /// Art-Net universe the show is patched on
    #[serde(default)]
    pub universe: u16,
}

impl Show {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Find an act by id, falling back to its name
    pub fn find_act(&self, key: &str) -> Option<&Act> {
        self.acts
            .iter()
            .find(|act| act.id.as_str() == key)
            .or_else(|| self.acts.iter().find(|act| act.name == key))
    }

    pub fn act(&self, id: &ActId) -> Option<&Act> {
        self.acts.iter().find(|act| &act.id == id)
    }

    /// Build the universe buffer with every fixture patched in
    pub fn build_universe(&self) -> Result<DmxUniverse> {
        let mut universe = DmxUniverse::new(self.universe);
        for fixture in &self.fixtures {
            universe.patch(fixture.clone())?;
        }
        Ok(universe)
    }
}

/// Save a show to `path` as RON or JSON, by extension
pub fn save_show(show: &Show, path: &Path) -> Result<()> {
    let mut file = ShowFile::new(show.clone());
    file.save(path)?;
    tracing::info!(show = %show.name, acts = show.acts.len(), path = %path.display(), "show saved");
    Ok(())
}

/// Load a show from `path`.
///
/// Acts come back idle: playback state stored in the file is cleared.
pub fn load_show(path: &Path) -> Result<Show> {
    let file = ShowFile::load(path)?;

    if file.version != SHOW_FILE_VERSION {
        return Err(IoError::VersionMismatch {
            expected: SHOW_FILE_VERSION.to_string(),
            found: file.version,
        });
    }

    let mut show = file.show;
    for act in &mut show.acts {
        act.reset_playback();
    }
    tracing::info!(show = %show.name, acts = show.acts.len(), path = %path.display(), "show loaded");
    Ok(show)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actflow_control::FixtureProfile;
    use tempfile::NamedTempFile;

    fn patched_show() -> Show {
        let mut show = Show::new("Patch");
        show.fixtures = vec![
            Fixture::new("left", "Left", FixtureProfile::rgb_par(), 0, 1),
            Fixture::new("right", "Right", FixtureProfile::rgb_par(), 0, 4),
        ];
        show
    }

    #[test]
    fn test_version_mismatch() {
        let mut file = ShowFile::new(Show::new("Old"));
        file.version = "0.1.0".to_string();

        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().with_extension("ron");
        file.save(&path).unwrap();

        match load_show(&path) {
            Err(IoError::VersionMismatch { expected, found }) => {
                assert_eq!(expected, SHOW_FILE_VERSION);
                assert_eq!(found, "0.1.0");
            }
            other => panic!("expected version mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_unsupported_format() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().with_extension("txt");
        assert!(matches!(
            save_show(&Show::new("Text"), &path),
            Err(IoError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_build_universe_patches_fixtures() {
        let universe = patched_show().build_universe().unwrap();
        assert_eq!(universe.fixtures().len(), 2);

        let mut broken = patched_show();
        broken.fixtures[1].start_address = 2;
        assert!(matches!(broken.build_universe(), Err(IoError::Patch(_))));
    }

    #[test]
    fn test_find_act_by_id_or_name() {
        let mut show = Show::new("Lookup");
        let act = Act::new("Intro");
        let id = act.id.clone();
        show.acts.push(act);

        assert_eq!(show.find_act("Intro").map(|a| &a.id), Some(&id));
        assert_eq!(show.find_act(id.as_str()).map(|a| &a.name[..]), Some("Intro"));
        assert!(show.find_act("Outro").is_none());
        assert!(show.act(&id).is_some());
    }
}
