//! Sprite viewer for the nabu renderer.
//!
//! Animates a procedural scene (atlas discs and margin tiles) and, when given
//! a path, an image file in the middle of the window.

mod app;
mod scene;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use winit::dpi::LogicalSize;

use nabu_engine::config::RendererConfig;
use nabu_engine::device::gpu::GpuInit;
use nabu_engine::logging::{init_logging, LoggingConfig};

use crate::app::ViewerConfig;
use crate::scene::DemoScene;

#[derive(Parser, Debug)]
#[command(name = "nabu-viewer", version, about = "Render an animated sprite scene with nabu")]
struct Cli {
    /// Image drawn in the middle of the scene.
    image: Option<PathBuf>,

    /// Stage background as `#RRGGBB`; empty clears to transparent.
    #[arg(long, default_value = "#1E1E24")]
    background: String,

    /// Initial window width in logical pixels.
    #[arg(long, default_value_t = 1024.0)]
    width: f64,

    /// Initial window height in logical pixels.
    #[arg(long, default_value_t = 768.0)]
    height: f64,

    /// Number of animated sprites.
    #[arg(long, default_value_t = 48)]
    sprites: usize,

    /// Cap on texture units used per frame.
    #[arg(long)]
    unit_budget: Option<usize>,

    /// Prefer an sRGB surface format.
    #[arg(long)]
    srgb: bool,

    /// Log filter, e.g. `nabu_engine=trace`. Defaults to `RUST_LOG`.
    #[arg(long)]
    log: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(match cli.log {
        Some(filter) => LoggingConfig::with_filter(filter),
        None => LoggingConfig::default(),
    });

    let image = cli.image.as_deref().map(scene::load_image).transpose()?;
    let scene = DemoScene::new(cli.sprites, image)?;

    let config = ViewerConfig {
        initial_size: LogicalSize::new(cli.width, cli.height),
        background: cli.background,
        renderer: RendererConfig { unit_budget: cli.unit_budget },
        gpu: GpuInit {
            prefer_srgb: cli.srgb,
            texture_units: cli.unit_budget.and_then(|n| u32::try_from(n).ok()),
            ..GpuInit::default()
        },
        ..ViewerConfig::default()
    };

    app::run(config, scene)
}
