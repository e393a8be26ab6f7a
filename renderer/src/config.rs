//! TOML configuration for baking and rendering.

use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use boxworld_geometry::Color;
use serde::Deserialize;

use crate::{
    batch::MAX_QUADS,
    font::{FontAtlas, RasterizationFlags},
};

/// An inclusive range of codepoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CodepointRange {
    pub first: u32,
    pub last: u32,
}

impl CodepointRange {
    pub const PRINTABLE_ASCII: Self = Self {
        first: 0x20,
        last: 0x7f,
    };
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FontBakeConfig {
    pub path: PathBuf,
    pub pixel_size: u32,
    #[serde(default = "enabled")]
    pub hinting: bool,
    #[serde(default)]
    pub force_autohint: bool,
    #[serde(default = "enabled")]
    pub anti_alias: bool,
    #[serde(default = "default_codepoints")]
    pub codepoints: Vec<CodepointRange>,
}

impl FontBakeConfig {
    /// All configured codepoints, ascending and without duplicates.
    pub fn codepoints(&self) -> Vec<u32> {
        self.codepoints
            .iter()
            .flat_map(|range| range.first..=range.last)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn flags(&self) -> RasterizationFlags {
        let mut flags = RasterizationFlags::empty();
        flags.set(RasterizationFlags::HINTING, self.hinting);
        flags.set(RasterizationFlags::FORCE_AUTOHINT, self.force_autohint);
        flags.set(RasterizationFlags::ANTI_ALIAS, self.anti_alias);
        flags
    }

    pub fn bake(&self) -> crate::Result<FontAtlas> {
        FontAtlas::bake_font(
            &self.path,
            self.pixel_size,
            self.hinting,
            self.force_autohint,
            self.anti_alias,
            &self.codepoints(),
        )
    }

    fn validate(&self) -> Result<()> {
        if self.pixel_size == 0 {
            bail!("font.pixel_size must be positive");
        }
        if let Some(range) = self.codepoints.iter().find(|r| r.first > r.last) {
            bail!(
                "Codepoint range {:#x}..={:#x} is empty",
                range.first,
                range.last
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RendererConfig {
    /// Quads per draw call.
    pub max_quads: usize,
    /// Linear instead of nearest texture filtering.
    pub smooth_filtering: bool,
    pub clear_color: Color,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            max_quads: MAX_QUADS,
            smooth_filtering: false,
            clear_color: Color::new(0.5, 0.5, 0.5, 0.5),
        }
    }
}

/// What to bake and where to put it.
///
/// Relative paths in a loaded file are resolved against the file's directory.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BakeConfig {
    pub font: FontBakeConfig,
    /// Images packed into the sprite atlas, in sprite index order.
    #[serde(default)]
    pub sprites: Vec<PathBuf>,
    /// The output directory.
    pub output: PathBuf,
    #[serde(default)]
    pub renderer: RendererConfig,
}

impl BakeConfig {
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml).context("Parsing bake configuration")?;
        config.font.validate()?;
        if config.renderer.max_quads == 0 {
            bail!("renderer.max_quads must be positive");
        }
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let toml = fs::read_to_string(path)
            .with_context(|| format!("Reading bake configuration {}", path.display()))?;
        let mut config =
            Self::from_toml_str(&toml).with_context(|| format!("In {}", path.display()))?;

        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        resolve(&mut self.font.path);
        resolve(&mut self.output);
        self.sprites.iter_mut().for_each(resolve);
    }
}

fn enabled() -> bool {
    true
}

fn default_codepoints() -> Vec<CodepointRange> {
    vec![CodepointRange::PRINTABLE_ASCII]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_configuration() {
        let toml = r#"
            sprites = ["tiles/wall.png", "tiles/box.png"]
            output = "baked"

            [font]
            path = "DroidSans.ttf"
            pixel_size = 16
            hinting = false
            force_autohint = true
            anti_alias = false
            codepoints = [
                { first = 0x41, last = 0x43 },
                { first = 0xe9, last = 0xe9 },
            ]

            [renderer]
            max_quads = 1024
            clear_color = [0.0, 0.0, 0.0, 1.0]
        "#;

        let config = BakeConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.font.pixel_size, 16);
        assert_eq!(config.font.codepoints(), vec![0x41, 0x42, 0x43, 0xe9]);
        assert_eq!(
            config.font.flags(),
            RasterizationFlags::FORCE_AUTOHINT
        );
        assert_eq!(config.sprites.len(), 2);
        assert_eq!(config.renderer.max_quads, 1024);
        assert!(!config.renderer.smooth_filtering);
        assert_eq!(config.renderer.clear_color, Color::BLACK);
    }

    #[test]
    fn defaults() {
        let config = BakeConfig::from_toml_str(
            r#"
            output = "out"
            [font]
            path = "font.ttf"
            pixel_size = 12
            "#,
        )
        .unwrap();

        assert!(config.sprites.is_empty());
        assert_eq!(
            config.font.flags(),
            RasterizationFlags::HINTING | RasterizationFlags::ANTI_ALIAS
        );
        let codepoints = config.font.codepoints();
        assert_eq!(codepoints.len(), 96);
        assert_eq!(codepoints.first(), Some(&0x20));
        assert_eq!(config.renderer, RendererConfig::default());
        assert_eq!(config.renderer.max_quads, MAX_QUADS);
    }

    #[test]
    fn overlapping_ranges_are_merged() {
        let font = FontBakeConfig {
            path: "f.ttf".into(),
            pixel_size: 8,
            hinting: true,
            force_autohint: false,
            anti_alias: true,
            codepoints: vec![
                CodepointRange { first: 5, last: 8 },
                CodepointRange { first: 1, last: 6 },
            ],
        };
        assert_eq!(font.codepoints(), (1..=8).collect::<Vec<_>>());
    }

    #[test]
    fn rejects_invalid_values() {
        let zero_size = r#"
            output = "out"
            [font]
            path = "font.ttf"
            pixel_size = 0
        "#;
        assert!(BakeConfig::from_toml_str(zero_size).is_err());

        let reversed = r#"
            output = "out"
            [font]
            path = "font.ttf"
            pixel_size = 10
            codepoints = [{ first = 10, last = 1 }]
        "#;
        assert!(BakeConfig::from_toml_str(reversed).is_err());

        let unknown = r#"
            output = "out"
            colour = "red"
            [font]
            path = "font.ttf"
            pixel_size = 10
        "#;
        assert!(BakeConfig::from_toml_str(unknown).is_err());
    }

    #[test]
    fn resolves_relative_paths() {
        let mut config = BakeConfig::from_toml_str(
            r#"
            sprites = ["box.png", "/abs/wall.png"]
            output = "out"
            [font]
            path = "font.ttf"
            pixel_size = 12
            "#,
        )
        .unwrap();
        config.resolve_paths(Path::new("/game/assets"));

        assert_eq!(config.font.path, Path::new("/game/assets/font.ttf"));
        assert_eq!(config.output, Path::new("/game/assets/out"));
        assert_eq!(config.sprites[0], Path::new("/game/assets/box.png"));
        assert_eq!(config.sprites[1], Path::new("/abs/wall.png"));
    }

    #[test]
    fn missing_file_has_context() {
        let error = BakeConfig::load("/nonexistent/bake.toml").unwrap_err();
        assert!(format!("{error:#}").contains("/nonexistent/bake.toml"));
    }
}
