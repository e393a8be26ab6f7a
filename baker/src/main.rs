//! Bakes a font atlas and a sprite atlas from a TOML configuration.
//!
//! Writes `font.png` + `font.atlas` and, if sprites are configured, `sprites.png` +
//! `sprites.atlas` into the output directory. The `.atlas` files are postcard encoded and
//! loaded with `FontAtlas::from_bytes` and `Atlas::from_bytes`.
use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use boxworld_renderer::{BakeConfig, PixelBuffer, build_atlas, pixels::decode_image_file};
use clap::Parser;
use log::info;

#[derive(Parser, Debug)]
#[command(name = "boxworld-baker", about = "Bakes BoxWorld font and sprite atlases")]
struct Cli {
    /// The bake configuration.
    config: PathBuf,
    /// Overrides the configured output directory.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Overrides the configured font pixel size.
    #[arg(long)]
    pixel_size: Option<u32>,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let mut config = BakeConfig::load(&cli.config)?;
    if let Some(output) = cli.output {
        config.output = output;
    }
    if let Some(pixel_size) = cli.pixel_size {
        config.font.pixel_size = pixel_size;
    }

    fs::create_dir_all(&config.output)
        .with_context(|| format!("Creating output directory {}", config.output.display()))?;

    bake_font(&config)?;

    if config.sprites.is_empty() {
        info!("No sprites configured");
    } else {
        bake_sprites(&config)?;
    }

    Ok(())
}

fn bake_font(config: &BakeConfig) -> Result<()> {
    let font = &config.font;
    let atlas = font
        .bake()
        .with_context(|| format!("Baking {}", font.path.display()))?;

    write_png(config, "font.png", atlas.texture())?;
    write(config, "font.atlas", &atlas.to_bytes()?)?;

    let max = atlas.max_glyph_size();
    info!(
        "Font: {} glyphs, largest {}x{}",
        atlas.glyphs().len(),
        max.width,
        max.height
    );
    Ok(())
}

fn bake_sprites(config: &BakeConfig) -> Result<()> {
    let sources = config
        .sprites
        .iter()
        .map(|path| {
            decode_image_file(path).with_context(|| format!("Loading sprite {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let atlas = build_atlas(&sources).context("Building the sprite atlas")?;

    write_png(config, "sprites.png", atlas.pixels())?;
    write(config, "sprites.atlas", &atlas.to_bytes()?)?;

    info!("Sprites: {} packed", atlas.len());
    Ok(())
}

fn write_png(config: &BakeConfig, name: &str, pixels: &PixelBuffer) -> Result<()> {
    write(config, name, &pixels.encode_png()?)
}

fn write(config: &BakeConfig, name: &str, bytes: &[u8]) -> Result<()> {
    let path = config.output.join(name);
    fs::write(&path, bytes).with_context(|| format!("Writing {}", path.display()))?;
    info!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}
