//! Interactive 2D crystal growth viewer built with eframe/egui.
//!
//! This module defines [`Viewer`], which owns the simulation state
//! (particle pool, crystallization engine, boundary, configuration)
//! and implements [`eframe::App`] to render and control the cycle of
//! growth, crystallization and perimeter reconstruction.

use std::path::Path;

use crystal_core::{
    config::{CrystalConfig, GrowthMode, PoolConfig, RebuildConfig, square_boundary},
    frontier::CrystalEngine,
    particle::ParticlePool,
    persist::ShapeStore,
};
use eframe::App;
use glam::Vec2;
use rand::rng;

/// How long the pool runs in growth mode before a crystallization
/// episode starts, in simulated seconds.
const DEFAULT_GROW_DURATION: f32 = 4.0;

/// Where completed shapes are persisted, relative to the working
/// directory.
const SHAPE_ROOT: &str = "shapes";

/// Main application state for the interactive viewer.
///
/// [`Viewer`] glues together:
/// - The simulation core: [`ParticlePool`], [`CrystalEngine`], the
///   current boundary polygon.
/// - Run-scoped persistence through [`ShapeStore`] (optional; the
///   simulation keeps running if the store cannot be created).
/// - eframe/egui callbacks for drawing and user interaction.
///
/// The typical per-frame update is:
/// 1. Handle UI interactions / input.
/// 2. If `running` is `true` and enough time has passed, call
///    [`Viewer::step_once`].
/// 3. Render the boundary, emitters, particles, lattice and open slots.
///
/// ### Fields
/// - `boundary` - Current boundary polygon (CCW).
/// - `pool` - Free particle pool fed by boundary emitters.
/// - `engine` - Crystallization engine (frontier slots and lattice).
/// - `store` - Shape persistence for this run, if available.
///
/// - `mode` - Current phase of the cycle.
/// - `cycle` - Number of completed crystallization episodes.
/// - `grow_time` - Simulated seconds spent in the current growth phase.
/// - `grow_duration` - Growth phase length before crystallizing.
///
/// - `rng` - Random number generator for emission and branch draws.
///
/// - `running` - Whether the simulation is currently auto-advancing.
/// - `zoom` - Zoom factor for world-to-screen coordinate mapping.
/// - `pan` - Screen-space pan offset in pixels.
///
/// - `step_interval` - Target time step between automatic simulation steps (seconds).
/// - `last_step_time` - Time stamp of the last step (egui time).
/// - `last_step_dt` - Actual time delta between the last two steps (for display only).
pub struct Viewer {
    boundary: Vec<Vec2>,
    pool: ParticlePool,
    engine: CrystalEngine,
    store: Option<ShapeStore>,

    mode: GrowthMode,
    cycle: u32,
    grow_time: f32,
    grow_duration: f32,

    rng: rand::rngs::ThreadRng,

    running: bool,
    zoom: f32,
    pan: egui::Vec2,

    step_interval: f64,
    last_step_time: f64,
    last_step_dt: f64,
}

impl Viewer {
    /// Creates a new viewer with a square seed boundary.
    ///
    /// The default setup is:
    /// - A CCW square of half extent `60` centered on the origin.
    /// - A [`ParticlePool`] with emitters generated from that square.
    /// - An idle [`CrystalEngine`] with default tuning.
    /// - A [`ShapeStore`] under `shapes/` if the directory can be
    ///   created; otherwise persistence is disabled with a warning.
    ///
    /// The camera starts with a moderate zoom and no pan.
    pub fn new() -> Self {
        let store = match ShapeStore::create(Path::new(SHAPE_ROOT)) {
            Ok(store) => Some(store),
            Err(err) => {
                log::warn!("persistence disabled: {err}");
                None
            }
        };
        Self::with_store(store)
    }

    /// Creates a viewer with an explicit (possibly absent) shape store.
    fn with_store(store: Option<ShapeStore>) -> Self {
        let boundary = square_boundary(60.0);
        let mut pool = ParticlePool::new(PoolConfig::default());
        pool.set_boundary(&boundary);
        let engine = CrystalEngine::new(CrystalConfig::default(), RebuildConfig::default());

        Self {
            boundary,
            pool,
            engine,
            store,
            mode: GrowthMode::Growth,
            cycle: 0,
            grow_time: 0.0,
            grow_duration: DEFAULT_GROW_DURATION,
            rng: rng(),
            running: false,
            zoom: 2.0,
            pan: egui::vec2(0.0, 0.0),
            step_interval: 0.05,
            last_step_time: 0.0,
            last_step_dt: 0.0,
        }
    }

    /// Resets the simulation to the seed boundary.
    ///
    /// This keeps the current configuration and camera settings, but:
    /// - Restores the square seed boundary and its emitters.
    /// - Clears all particles and any in-progress crystallization.
    /// - Resets the cycle counter and growth timer and stops
    ///   auto-running.
    ///
    /// The shape store is kept: resets within one session append to the
    /// same run.
    fn reset(&mut self) {
        self.boundary = square_boundary(60.0);
        self.pool.set_boundary(&self.boundary);
        self.pool.clear();
        self.engine = CrystalEngine::new(self.engine.cfg, self.engine.rebuild_cfg);
        self.mode = GrowthMode::Growth;
        self.cycle = 0;
        self.grow_time = 0.0;
        self.running = false;
    }

    /// Advances the simulation by a single step of `step_interval`
    /// simulated seconds.
    ///
    /// The step consists of:
    /// 1. [`ParticlePool::step`] under the current mode.
    /// 2. In growth mode, accumulate `grow_time`; once `grow_duration`
    ///    elapses, start a crystallization episode on the current
    ///    boundary.
    /// 3. In crystallizing mode, [`CrystalEngine::tick`]; when it
    ///    returns the reconstructed polygon, finish the cycle.
    fn step_once(&mut self) {
        let dt = self.step_interval as f32;
        self.pool.step(dt, self.mode, &mut self.rng);

        match self.mode {
            GrowthMode::Growth => {
                self.grow_time += dt;
                if self.grow_time >= self.grow_duration {
                    self.engine.begin(&self.boundary, &mut self.rng);
                    self.mode = GrowthMode::Crystallizing;
                    log::info!(
                        "cycle {}: crystallizing, {} frontier slots",
                        self.cycle,
                        self.engine.slots.len()
                    );
                }
            }
            GrowthMode::Crystallizing => {
                if let Some(new_boundary) = self.engine.tick(dt, &mut self.pool) {
                    self.finish_cycle(new_boundary);
                }
            }
        }
    }

    /// Completes a crystallization episode.
    ///
    /// Persists the finished shape (the boundary the episode grew
    /// from), installs the reconstructed polygon as the new boundary,
    /// regenerates emitters, clears leftover particles and returns to
    /// growth mode. Persistence failures are logged and otherwise
    /// ignored.
    fn finish_cycle(&mut self, new_boundary: Vec<Vec2>) {
        if let Some(store) = &mut self.store
            && let Err(err) = store.push(&self.boundary, cycle_color(self.cycle))
        {
            log::warn!("failed to persist shape {}: {err}", self.cycle);
        }

        log::info!(
            "cycle {} complete: {} lattice particles, boundary {} -> {} vertices",
            self.cycle,
            self.engine.lattice.len(),
            self.boundary.len(),
            new_boundary.len()
        );

        self.boundary = new_boundary;
        self.pool.set_boundary(&self.boundary);
        self.pool.clear();
        self.mode = GrowthMode::Growth;
        self.grow_time = 0.0;
        self.cycle += 1;
    }

    /// Converts a world-space position to screen-space.
    ///
    /// World coordinates are scaled by `zoom`, offset by `pan`, and then
    /// centered inside the given `rect`. The y-axis is flipped so that
    /// positive y goes up in world space.
    fn world_to_screen(&self, p: Vec2, rect: egui::Rect) -> egui::Pos2 {
        let center = rect.center();
        egui::pos2(
            center.x + p.x * self.zoom + self.pan.x,
            center.y - p.y * self.zoom + self.pan.y,
        )
    }

    /// Converts a screen-space position back to world-space.
    ///
    /// This is the inverse of [`Viewer::world_to_screen`] (up to floating
    /// point rounding), using the same `zoom`, `pan`, and `rect` center.
    fn screen_to_world(&self, p: egui::Pos2, rect: egui::Rect) -> Vec2 {
        let center = rect.center();
        let x = (p.x - center.x - self.pan.x) / self.zoom;
        let y = (center.y - p.y + self.pan.y) / self.zoom;
        Vec2::new(x, y)
    }

    /// Helper to draw a labeled `usize` [`egui::DragValue`].
    fn labeled_drag_usize(
        ui: &mut egui::Ui,
        label: &str,
        value: &mut usize,
        range: std::ops::RangeInclusive<usize>,
        speed: f64,
    ) {
        ui.horizontal(|ui| {
            ui.label(label);
            ui.add(egui::DragValue::new(value).range(range).speed(speed));
        });
    }

    /// Helper to draw a labeled `f32` [`egui::DragValue`].
    fn labeled_drag_f32(
        ui: &mut egui::Ui,
        label: &str,
        value: &mut f32,
        range: std::ops::RangeInclusive<f32>,
        speed: f64,
    ) {
        ui.horizontal(|ui| {
            ui.label(label);
            ui.add(egui::DragValue::new(value).range(range).speed(speed));
        });
    }

    /// Builds the top panel UI (run controls, stepping, zoom).
    fn ui_top_panel(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui
                    .button(if self.running { "⏸ Pause" } else { "▶ Run" })
                    .clicked()
                {
                    self.running = !self.running;
                }

                ui.add(
                    egui::DragValue::new(&mut self.step_interval)
                        .prefix("dt target = ")
                        .range(0.01..=1.0)
                        .speed(0.01),
                );

                if ui.button("Step").clicked() {
                    let now = ctx.input(|i| i.time);
                    if self.last_step_time > 0.0 {
                        self.last_step_dt = now - self.last_step_time;
                    }
                    self.step_once();
                    self.last_step_time = now;
                }

                if ui.button("Crystallize now").clicked() && self.mode == GrowthMode::Growth {
                    self.grow_time = self.grow_duration;
                }

                if ui.button("Reset").clicked() {
                    self.reset();
                }

                ui.separator();
                ui.add(egui::Slider::new(&mut self.zoom, 0.1..=10.0).text("Zoom"));
            });
        });
    }

    /// Builds the bottom status bar (phase, cycle, particle counts).
    fn ui_status_bar(&self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(format!("dt target = {:.3} s", self.step_interval));
                ui.label(format!("dt last = {:.3} s", self.last_step_dt));
                ui.separator();
                let phase = match self.mode {
                    GrowthMode::Growth => format!(
                        "growing {:.1}/{:.1} s",
                        self.grow_time, self.grow_duration
                    ),
                    GrowthMode::Crystallizing => "crystallizing".to_owned(),
                };
                ui.label(phase);
                ui.label(format!("cycle = {}", self.cycle));
                ui.separator();
                ui.label(format!("particles = {}", self.pool.particles.len()));
                ui.label(format!("lattice = {}", self.engine.lattice.len()));
                ui.label(format!(
                    "open slots = {}",
                    self.engine.slots.iter().filter(|s| !s.filled).count()
                ));
            });
        });
    }

    /// Builds the right-hand configuration panel for simulation parameters.
    fn ui_config_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::right("config_panel")
            .resizable(true)
            .default_width(220.0)
            .show(ctx, |ui| {
                ui.heading("Config");

                ui.separator();
                ui.label("Cycle");
                Self::labeled_drag_f32(
                    ui,
                    "grow_duration:",
                    &mut self.grow_duration,
                    0.5..=30.0,
                    0.1,
                );

                ui.separator();
                ui.label("Emission");
                Self::labeled_drag_f32(
                    ui,
                    "emit_period:",
                    &mut self.pool.cfg.emit_period,
                    0.01..=2.0,
                    0.01,
                );
                Self::labeled_drag_f32(
                    ui,
                    "base_speed:",
                    &mut self.pool.cfg.base_speed,
                    0.0..=200.0,
                    0.5,
                );
                Self::labeled_drag_f32(
                    ui,
                    "angle_jitter:",
                    &mut self.pool.cfg.angle_jitter,
                    0.0..=3.2,
                    0.01,
                );
                Self::labeled_drag_f32(
                    ui,
                    "lifetime:",
                    &mut self.pool.cfg.lifetime,
                    0.5..=60.0,
                    0.1,
                );

                ui.separator();
                ui.label("Forces");
                Self::labeled_drag_f32(
                    ui,
                    "interaction_radius:",
                    &mut self.pool.cfg.interaction_radius,
                    0.0..=50.0,
                    0.2,
                );
                Self::labeled_drag_f32(
                    ui,
                    "interaction_force:",
                    &mut self.pool.cfg.interaction_force,
                    -200.0..=200.0,
                    0.5,
                );
                Self::labeled_drag_f32(
                    ui,
                    "shape_attraction:",
                    &mut self.pool.cfg.shape_attraction,
                    0.0..=200.0,
                    0.5,
                );
                Self::labeled_drag_f32(
                    ui,
                    "outward_accel:",
                    &mut self.pool.cfg.outward_accel,
                    0.0..=200.0,
                    0.5,
                );
                Self::labeled_drag_f32(
                    ui,
                    "damping:",
                    &mut self.pool.cfg.damping,
                    0.0..=5.0,
                    0.02,
                );

                ui.separator();
                ui.label("Crystallization");
                Self::labeled_drag_f32(
                    ui,
                    "spacing:",
                    &mut self.engine.cfg.spacing,
                    2.0..=100.0,
                    0.5,
                );
                Self::labeled_drag_f32(
                    ui,
                    "capture_radius:",
                    &mut self.engine.cfg.capture_radius,
                    1.0..=100.0,
                    0.5,
                );
                Self::labeled_drag_usize(
                    ui,
                    "slots_per_tick:",
                    &mut self.engine.cfg.slots_per_tick,
                    1..=256,
                    1.0,
                );
                Self::labeled_drag_f32(
                    ui,
                    "quiescence_timeout:",
                    &mut self.engine.cfg.quiescence_timeout,
                    0.1..=10.0,
                    0.05,
                );

                ui.separator();
                ui.label("Rebuild");
                Self::labeled_drag_usize(
                    ui,
                    "max_vertices:",
                    &mut self.engine.rebuild_cfg.max_vertices,
                    3..=96,
                    1.0,
                );
                Self::labeled_drag_f32(
                    ui,
                    "outward_bias:",
                    &mut self.engine.rebuild_cfg.outward_bias,
                    0.0..=50.0,
                    0.2,
                );

                ui.separator();
                if ui.button("Reset cfg to default").clicked() {
                    self.pool.cfg = PoolConfig::default();
                    self.engine.cfg = CrystalConfig::default();
                    self.engine.rebuild_cfg = RebuildConfig::default();
                    self.grow_duration = DEFAULT_GROW_DURATION;
                }
            });
    }

    /// Builds the central panel where the simulation is drawn and
    /// interacted with.
    fn ui_central_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let response = ui.allocate_response(ui.available_size(), egui::Sense::click_and_drag());
            let rect = response.rect;
            let painter = ui.painter_at(rect);

            // Pan with drag.
            if response.dragged() {
                let delta = response.drag_delta();
                self.pan += delta;
            }

            // Zoom around the mouse cursor.
            if ui.ctx().input(|i| i.raw_scroll_delta.y != 0.0) {
                let scroll = ui.ctx().input(|i| i.raw_scroll_delta.y);
                if scroll != 0.0 {
                    let pointer_screen = response.hover_pos().unwrap_or(rect.center());

                    let world_before = self.screen_to_world(pointer_screen, rect);

                    let factor = (1.0 + scroll * 0.001).clamp(0.5, 2.0);
                    let new_zoom = (self.zoom * factor).clamp(0.1, 10.0);
                    self.zoom = new_zoom;

                    let screen_after = self.world_to_screen(world_before, rect);

                    let delta = pointer_screen - screen_after;
                    self.pan += delta;
                }
            }

            // Draw the current boundary polygon.
            if self.boundary.len() >= 3 {
                let points: Vec<egui::Pos2> = self
                    .boundary
                    .iter()
                    .map(|&p| self.world_to_screen(p, rect))
                    .collect();
                painter.add(egui::Shape::closed_line(
                    points,
                    egui::Stroke::new(1.5, egui::Color32::LIGHT_GREEN),
                ));
            }

            // Draw emitters.
            for e in &self.pool.emitters {
                let p = self.world_to_screen(e.pos, rect);
                painter.circle_filled(p, 2.0, egui::Color32::DARK_GREEN);
            }

            // Draw free particles.
            for particle in &self.pool.particles {
                let p = self.world_to_screen(particle.pos, rect);
                painter.circle_filled(p, 2.0, egui::Color32::LIGHT_BLUE);
            }

            // Draw open slot capture targets while crystallizing.
            if self.engine.is_crystallizing() {
                let spacing = self.engine.cfg.spacing;
                for slot in self.engine.slots.iter().filter(|s| !s.filled) {
                    let p = self.world_to_screen(slot.target(spacing), rect);
                    painter.circle_stroke(p, 3.0, egui::Stroke::new(1.0, egui::Color32::YELLOW));
                }
            }

            // Draw the lattice.
            for l in self.engine.lattice.iter().filter(|l| l.drawable) {
                let p = self.world_to_screen(l.pos, rect);
                painter.circle_filled(p, 2.5, egui::Color32::WHITE);
            }

            // Auto-run simulation if requested.
            if self.running {
                let now = ctx.input(|i| i.time);
                let elapsed = now - self.last_step_time;
                if elapsed >= self.step_interval {
                    if self.last_step_time > 0.0 {
                        self.last_step_dt = elapsed;
                    }
                    self.step_once();
                    self.last_step_time = now;
                }

                ctx.request_repaint();
            }
        });
    }
}

impl App for Viewer {
    /// eframe callback that builds all UI panels for each frame.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.ui_top_panel(ctx);
        self.ui_status_bar(ctx);
        self.ui_config_panel(ctx);
        self.ui_central_panel(ctx);
    }
}

/// RGBA color tag for the shape saved at the end of a cycle.
///
/// Walks the hue wheel in golden-ratio steps so consecutive shapes get
/// clearly distinct colors.
fn cycle_color(cycle: u32) -> [f32; 4] {
    let hue = (cycle as f32 * 0.381_966).fract();
    let (r, g, b) = hsl_to_rgb(hue, 0.65, 0.55);
    [r, g, b, 0.85]
}

/// Converts HSL (all components in `[0, 1]`) to RGB.
fn hsl_to_rgb(h: f32, s: f32, l: f32) -> (f32, f32, f32) {
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let hp = h * 6.0;
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
    let (r1, g1, b1) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    (r1 + m, g1 + m, b1 + m)
}
