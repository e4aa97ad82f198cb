use std::time::Instant;

use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use nabu_engine::config::{RendererConfig, StageConfig};
use nabu_engine::device::GraphicsDevice;
use nabu_engine::device::gpu::{GpuInit, WgpuDevice};
use nabu_engine::render::{FrameRenderer, RenderError};

use crate::scene::DemoScene;

/// Frames between stats lines.
const STATS_EVERY: u64 = 300;

/// Window and renderer setup.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    /// Stage background, `#RRGGBB` or empty.
    pub background: String,
    pub renderer: RendererConfig,
    pub gpu: GpuInit,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: "nabu".to_string(),
            initial_size: LogicalSize::new(1024.0, 768.0),
            background: String::new(),
            renderer: RendererConfig::default(),
            gpu: GpuInit::default(),
        }
    }
}

/// Opens one window and renders `scene` into it until closed.
pub fn run(config: ViewerConfig, scene: DemoScene) -> Result<()> {
    let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
    let mut state = Viewer::new(config, scene);

    event_loop
        .run_app(&mut state)
        .context("winit event loop terminated with error")?;

    if let Some(err) = state.failure {
        return Err(err);
    }
    Ok(())
}

#[self_referencing]
struct WindowEntry {
    window: Window,

    #[borrows(window)]
    #[not_covariant]
    renderer: FrameRenderer<WgpuDevice<'this>>,
}

struct Viewer {
    config: ViewerConfig,
    scene: DemoScene,

    entry: Option<(WindowId, WindowEntry)>,
    started: Instant,
    frames: u64,

    exit_requested: bool,
    failure: Option<anyhow::Error>,
}

impl Viewer {
    fn new(config: ViewerConfig, scene: DemoScene) -> Self {
        Self {
            config,
            scene,
            entry: None,
            started: Instant::now(),
            frames: 0,
            exit_requested: false,
            failure: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.failure = Some(err);
        self.exit_requested = true;
        event_loop.exit();
    }

    fn create_window_entry(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let id = window.id();
        let stage = stage_for(&window, &self.config.background);
        let (gpu, renderer) = (&self.config.gpu, &self.config.renderer);

        let entry = WindowEntryTryBuilder {
            window,
            renderer_builder: |w: &Window| build_renderer(w, gpu, stage, renderer.clone()),
        }
        .try_build()?;

        self.entry = Some((id, entry));
        Ok(())
    }

    /// Pushes the window's current size and scale into the stage.
    fn sync_stage(&mut self) {
        let Some((_, entry)) = self.entry.as_mut() else {
            return;
        };
        let background = &self.config.background;
        entry.with_mut(|fields| {
            *fields.renderer.stage_mut() = stage_for(fields.window, background);
            fields.renderer.resize();
            fields.window.request_redraw();
        });
    }

    fn redraw(&mut self) -> Result<(), RenderError> {
        let Some((_, entry)) = self.entry.as_mut() else {
            return Ok(());
        };

        let t = self.started.elapsed().as_secs_f32();
        let scene = &mut self.scene;
        let frame = self.frames;

        entry.with_renderer_mut(|renderer| {
            render_frame(renderer, scene, t)?;

            if frame % STATS_EVERY == 0 {
                let stats = renderer.stats();
                log::info!(
                    "frame {frame}: {} draws, {} skipped, {} uploads, {} rebinds, {} unit overflows",
                    stats.draw_calls,
                    stats.skipped,
                    stats.uploads,
                    stats.rebinds,
                    stats.unit_overflows,
                );
            }
            Ok::<(), RenderError>(())
        })?;

        self.frames += 1;
        Ok(())
    }
}

impl ApplicationHandler for Viewer {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() {
            return;
        }

        if let Err(err) = self.create_window_entry(event_loop) {
            self.fail(event_loop, err.context("failed to create initial window"));
            return;
        }

        if let Some((_, entry)) = &self.entry {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        event_loop.set_control_flow(ControlFlow::Wait);

        // The scene animates, so redraw continuously.
        if let Some((_, entry)) = &self.entry {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }
        if !matches!(&self.entry, Some((id, _)) if *id == window_id) {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                // Drop the renderer (and its textures) before the event loop winds down.
                self.entry = None;
                self.exit_requested = true;
                event_loop.exit();
            }

            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed
                    && event.physical_key == PhysicalKey::Code(KeyCode::Escape) =>
            {
                self.entry = None;
                self.exit_requested = true;
                event_loop.exit();
            }

            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                self.sync_stage();
            }

            WindowEvent::RedrawRequested => {
                if let Err(err) = self.redraw() {
                    self.fail(event_loop, anyhow::Error::new(err).context("frame failed"));
                }
            }

            _ => {}
        }
    }
}

fn build_renderer<'w>(
    window: &'w Window,
    gpu: &GpuInit,
    stage: StageConfig,
    config: RendererConfig,
) -> Result<FrameRenderer<WgpuDevice<'w>>> {
    let device = WgpuDevice::new_blocking(window, gpu).context("GPU initialization failed")?;
    let renderer =
        FrameRenderer::init(device, stage, config).context("renderer initialization failed")?;
    let adapter = renderer.device().context().adapter_info();
    log::info!(
        "rendering on {} with {} texture units",
        adapter.name,
        renderer.unit_budget()
    );
    Ok(renderer)
}

fn stage_for(window: &Window, background: &str) -> StageConfig {
    let scale = window.scale_factor();
    let logical: LogicalSize<f64> = window.inner_size().to_logical(scale);
    StageConfig {
        background: background.to_owned(),
        logical_width: logical.width as f32,
        logical_height: logical.height as f32,
        device_pixel_ratio: scale as f32,
    }
}

/// Advances the scene and draws one frame.
fn render_frame<D: GraphicsDevice>(
    renderer: &mut FrameRenderer<D>,
    scene: &mut DemoScene,
    t: f32,
) -> Result<(), RenderError> {
    let size = (renderer.target().width() as f32, renderer.target().height() as f32);
    scene.update(t, size, renderer.stage().device_pixel_ratio);

    for id in scene.take_retired() {
        renderer.release_bitmap(id);
    }

    renderer.begin();
    for node in scene.nodes() {
        renderer.draw(node)?;
    }
    if let Some(image) = scene.image() {
        renderer.begin_mask(image);
        renderer.draw(image)?;
        renderer.end_mask();
    }
    renderer.end()
}
