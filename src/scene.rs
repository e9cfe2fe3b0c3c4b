//! Scene hooks - the demo side of the harness
//!
//! The harness only triggers these; what they look like on screen belongs to
//! whatever host embeds the harness. [`HeadlessScene`] runs the same logic
//! without rendering: the spatialisation orbit drives its own patch, dynamic
//! instances are tracked by id, and array plots can be exported as PNGs.

use bevy::prelude::*;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use std::f32::consts::TAU;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

use crate::constants::*;
use crate::engine::EngineAdapter;

/// Operations the harness triggers outside the engine boundary
pub trait SceneHooks: Send + Sync {
    /// Start the sound source circling the listener
    fn trigger_spatialise(&mut self);
    /// Instantiate a patch-carrying object
    fn create_dynamic_instance(&mut self);
    /// Remove it again; false if there was nothing to remove
    fn delete_dynamic_instance(&mut self) -> bool;
    /// Show the read-back array
    fn plot_array(&mut self, points: &[Vec2]);
    /// Advance per-frame animation
    fn update(&mut self, _delta: Duration) {}
}

/// Sound source moving once around the listener
#[derive(Debug, Default, Clone)]
pub struct Orbit {
    angle: f32,
    moving: bool,
    position: Vec3,
}

impl Orbit {
    pub fn start(&mut self, engine: &mut dyn EngineAdapter) {
        self.moving = true;
        engine.send_float(SPATIALISE_LEVEL, 1.0);
        engine.send_float(SPATIALISE_TOGGLE, 1.0);
    }

    /// One animation frame. Returns true on the frame the revolution completes.
    pub fn step(&mut self, engine: &mut dyn EngineAdapter) -> bool {
        if !self.moving {
            return false;
        }

        self.position = Vec3::new(
            self.angle.sin() * ORBIT_RADIUS,
            0.0,
            ORBIT_CENTRE_Z - self.angle.cos() * ORBIT_RADIUS,
        );

        self.angle += ORBIT_STEP;
        if self.angle > TAU {
            self.moving = false;
            self.angle = 0.0;
            engine.send_float(SPATIALISE_LEVEL, 0.0);
            engine.send_float(SPATIALISE_TOGGLE, 1.0);
            return true;
        }
        false
    }

    pub fn is_moving(&self) -> bool {
        self.moving
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }
}

/// What the headless scene was asked to do, in order
#[derive(Debug, Clone, PartialEq)]
pub enum SceneCall {
    Spatialise,
    CreateInstance(Uuid),
    DeleteInstance(Uuid),
    Plot(Vec<Vec2>),
}

pub struct HeadlessScene {
    /// Patch driven by the orbit
    spatialise_engine: Box<dyn EngineAdapter>,
    orbit: Orbit,
    instance: Option<Uuid>,
    plot_dir: Option<PathBuf>,
    plots_written: usize,
    calls: Vec<SceneCall>,
}

impl HeadlessScene {
    pub fn new(spatialise_engine: Box<dyn EngineAdapter>) -> Self {
        Self {
            spatialise_engine,
            orbit: Orbit::default(),
            instance: None,
            plot_dir: None,
            plots_written: 0,
            calls: Vec::new(),
        }
    }

    /// Export every plotted array as a PNG into `dir`
    pub fn with_plot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.plot_dir = Some(dir.into());
        self
    }

    pub fn calls(&self) -> &[SceneCall] {
        &self.calls
    }

    pub fn orbit(&self) -> &Orbit {
        &self.orbit
    }

    pub fn instance(&self) -> Option<Uuid> {
        self.instance
    }

    fn export_plot(&mut self, points: &[Vec2]) {
        let Some(dir) = &self.plot_dir else {
            return;
        };
        if let Err(e) = std::fs::create_dir_all(dir) {
            warn!("Failed to create plot directory: {}", e);
            return;
        }

        let path = dir.join(format!("array_plot_{}.png", self.plots_written));
        match render_plot(points).save(&path) {
            Ok(()) => {
                self.plots_written += 1;
                info!("Array plot written to {}", path.display());
            }
            Err(e) => warn!("Failed to save array plot: {}", e),
        }
    }
}

impl SceneHooks for HeadlessScene {
    fn trigger_spatialise(&mut self) {
        self.calls.push(SceneCall::Spatialise);
        self.orbit.start(self.spatialise_engine.as_mut());
    }

    fn create_dynamic_instance(&mut self) {
        let id = Uuid::new_v4();
        self.calls.push(SceneCall::CreateInstance(id));
        if let Some(old) = self.instance.replace(id) {
            warn!("Dynamic instance {} replaced before deletion", old);
        }
        info!("Instantiated dynamic patch instance {}", id);
    }

    fn delete_dynamic_instance(&mut self) -> bool {
        let Some(id) = self.instance.take() else {
            return false;
        };
        self.calls.push(SceneCall::DeleteInstance(id));
        info!("Deleted dynamic patch instance {}", id);
        true
    }

    fn plot_array(&mut self, points: &[Vec2]) {
        self.calls.push(SceneCall::Plot(points.to_vec()));
        self.export_plot(points);
    }

    fn update(&mut self, _delta: Duration) {
        if self.orbit.step(self.spatialise_engine.as_mut()) {
            info!("Spatialisation orbit complete");
        }
    }
}

const PLOT_WIDTH: u32 = 440;
const PLOT_HEIGHT: u32 = 240;
const PLOT_MARGIN: f32 = 20.0;

/// Draw plot points as a polyline on a light background, zero line through the middle
pub fn render_plot(points: &[Vec2]) -> RgbImage {
    let mut img = RgbImage::from_pixel(PLOT_WIDTH, PLOT_HEIGHT, Rgb([230, 230, 230]));
    let mid_y = PLOT_HEIGHT as f32 / 2.0;
    let to_image = |p: Vec2| (PLOT_MARGIN + p.x, mid_y - p.y);

    draw_line_segment_mut(
        &mut img,
        (0.0, mid_y),
        (PLOT_WIDTH as f32, mid_y),
        Rgb([160, 160, 160]),
    );

    let line_color = Rgb([40, 90, 200]);
    for pair in points.windows(2) {
        draw_line_segment_mut(&mut img, to_image(pair[0]), to_image(pair[1]), line_color);
    }
    for p in points {
        let (x, y) = to_image(*p);
        draw_filled_circle_mut(&mut img, (x as i32, y as i32), 3, Rgb([200, 50, 50]));
    }
    img
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineCall, LoopbackEngine};

    #[test]
    fn test_orbit_single_revolution() {
        let mut engine = LoopbackEngine::new();
        let mut orbit = Orbit::default();
        orbit.start(&mut engine);
        assert!(orbit.is_moving());

        let mut frames = 0;
        while !orbit.step(&mut engine) {
            frames += 1;
            assert!(frames < 1000, "orbit never completed");
        }
        assert!(!orbit.is_moving());
        // 2π / 0.01, give or take float accumulation
        assert!((620..640).contains(&frames));

        let sends: Vec<_> = engine
            .calls()
            .iter()
            .filter_map(|c| match c {
                EngineCall::Float { receiver, value } => Some((receiver.as_str(), *value)),
                _ => None,
            })
            .collect();
        assert_eq!(
            sends,
            vec![("level", 1.0), ("toggle", 1.0), ("level", 0.0), ("toggle", 1.0)]
        );
    }

    #[test]
    fn test_orbit_position_on_circle() {
        let mut engine = LoopbackEngine::new();
        let mut orbit = Orbit::default();
        orbit.start(&mut engine);
        for _ in 0..100 {
            orbit.step(&mut engine);
        }
        let p = orbit.position();
        let radius = Vec2::new(p.x, p.z - ORBIT_CENTRE_Z).length();
        assert!((radius - ORBIT_RADIUS).abs() < 1e-3);
    }

    #[test]
    fn test_dynamic_instance_lifecycle() {
        let mut scene = HeadlessScene::new(Box::new(LoopbackEngine::new()));
        assert!(!scene.delete_dynamic_instance());

        scene.create_dynamic_instance();
        let id = scene.instance().unwrap();
        assert!(scene.delete_dynamic_instance());
        assert!(scene.instance().is_none());
        assert_eq!(
            scene.calls(),
            &[SceneCall::CreateInstance(id), SceneCall::DeleteInstance(id)]
        );
    }

    #[test]
    fn test_plot_export() {
        let dir = std::env::temp_dir().join(format!("patchcheck_plot_{}", Uuid::new_v4()));
        let mut scene = HeadlessScene::new(Box::new(LoopbackEngine::new())).with_plot_dir(&dir);
        scene.plot_array(&[Vec2::new(0.0, 50.0), Vec2::new(40.0, -50.0)]);

        let path = dir.join("array_plot_0.png");
        assert!(path.exists());
        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (PLOT_WIDTH, PLOT_HEIGHT));
    }
}
