use std::path::PathBuf;

use anyhow::{Context, Result};
use image::RgbaImage;

/// Maneuvers the reference library knows about.
pub const CANONICAL_MANEUVERS: [&str; 16] = [
    "forward",
    "in_circular_movement",
    "hard_turn_left",
    "hard_turn_right",
    "turn_left",
    "turn_right",
    "turn_back_left",
    "turn_back_right",
    "take_left",
    "take_right",
    "exit_left",
    "exit_right",
    "board_ferry",
    "out_circular_movement",
    "via",
    "finish",
];

/// Supplier of reference maneuver icons.
pub trait IconSource: Send + Sync {
    fn names(&self) -> Vec<String>;

    /// Pixels of the reference icon for `name`.
    ///
    /// Procedural sources draw at `size` x `size`. Raster sources return their
    /// pixels at native size so a pixel-identical icon normalizes to the same
    /// mask.
    fn render(&self, name: &str, size: u32) -> Result<RgbaImage>;
}

/// Reference icons stored as `<dir>/<maneuver>.png`, used at their native
/// size.
pub struct IconDirectory {
    dir: PathBuf,
}

impl IconDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl IconSource for IconDirectory {
    fn names(&self) -> Vec<String> {
        CANONICAL_MANEUVERS.iter().map(|name| name.to_string()).collect()
    }

    fn render(&self, name: &str, _size: u32) -> Result<RgbaImage> {
        let path = self.dir.join(format!("{name}.png"));
        let image = image::open(&path)
            .with_context(|| format!("Failed to load maneuver icon {}", path.display()))?
            .to_rgba8();
        Ok(image)
    }
}

/// Source with no icons; every classification reports "no match".
pub struct NoIcons;

impl IconSource for NoIcons {
    fn names(&self) -> Vec<String> {
        Vec::new()
    }

    fn render(&self, name: &str, _size: u32) -> Result<RgbaImage> {
        anyhow::bail!("no reference icon for {name}")
    }
}
