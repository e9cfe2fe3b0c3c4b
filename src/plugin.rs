//! Bevy wiring for the harness
//!
//! All harness state lives in resources and is driven by one chained system
//! set per frame: feed queued commands, pump echoes, handle commands, advance
//! the sequencer, update the scene, exit when done.

use bevy::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::VecDeque;

use crate::commands::{CommandTable, HarnessCommand};
use crate::config::HarnessConfig;
use crate::engine::{EngineAdapter, LoopbackEngine};
use crate::harness::{HarnessSession, RunContext, Sequencer};
use crate::scene::{HeadlessScene, SceneHooks};

/// The patch engine under test
#[derive(Resource)]
pub struct PatchEngine(pub Box<dyn EngineAdapter>);

impl PatchEngine {
    pub fn loopback() -> Self {
        Self(Box::new(LoopbackEngine::new()))
    }
}

/// Demo side of the harness
#[derive(Resource)]
pub struct DemoScene(pub Box<dyn SceneHooks>);

impl DemoScene {
    /// Headless scene with its own loopback spatialisation patch
    pub fn headless(config: &HarnessConfig) -> Self {
        let mut scene = HeadlessScene::new(Box::new(LoopbackEngine::new()));
        if let Some(dir) = &config.plot_dir {
            scene = scene.with_plot_dir(dir);
        }
        Self(Box::new(scene))
    }
}

#[derive(Resource)]
pub struct HarnessRng(pub StdRng);

/// Commands waiting to be issued, one per frame
#[derive(Resource, Default, Debug)]
pub struct PendingCommands(pub VecDeque<HarnessCommand>);

/// Frames spent with nothing queued and no run in progress
#[derive(Resource, Default, Debug)]
struct IdleFrames(u32);

/// Frames to stay idle before exiting, so the last echoes get pumped
const IDLE_FRAMES_BEFORE_EXIT: u32 = 2;

pub struct HarnessPlugin {
    pub config: HarnessConfig,
}

impl Plugin for HarnessPlugin {
    fn build(&self, app: &mut App) {
        let config = self.config.clone();

        if !app.world().contains_resource::<PatchEngine>() {
            app.insert_resource(PatchEngine::loopback());
        }
        if !app.world().contains_resource::<DemoScene>() {
            app.insert_resource(DemoScene::headless(&config));
        }

        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        app.add_message::<HarnessCommand>()
            .insert_resource(HarnessRng(rng))
            .insert_resource(HarnessSession::from_config(&config))
            .insert_resource(Sequencer::new(config.dynamic_delete_delay()))
            .init_resource::<CommandTable>()
            .init_resource::<PendingCommands>()
            .init_resource::<IdleFrames>()
            .insert_resource(config)
            .add_systems(Startup, start_session)
            .add_systems(
                Update,
                (
                    feed_pending_commands,
                    pump_echoes,
                    handle_commands,
                    advance_sequencer,
                    update_scene,
                    exit_when_done,
                )
                    .chain(),
            );
    }
}

fn start_session(mut session: ResMut<HarnessSession>, mut engine: ResMut<PatchEngine>) {
    session.start(engine.0.as_mut());
}

fn feed_pending_commands(
    mut pending: ResMut<PendingCommands>,
    mut commands: MessageWriter<HarnessCommand>,
) {
    if let Some(command) = pending.0.pop_front() {
        debug!("Issuing queued command '{}'", command.kind().name());
        commands.write(command);
    }
}

fn pump_echoes(
    mut session: ResMut<HarnessSession>,
    mut engine: ResMut<PatchEngine>,
    mut scene: ResMut<DemoScene>,
    mut sequencer: ResMut<Sequencer>,
    table: Res<CommandTable>,
    mut rng: ResMut<HarnessRng>,
) {
    let mut ctx = RunContext {
        engine: engine.0.as_mut(),
        scene: scene.0.as_mut(),
        sequencer: &mut sequencer,
        table: &table,
        rng: &mut rng.0,
    };
    session.deliver_echoes(&mut ctx);
}

fn handle_commands(
    mut reader: MessageReader<HarnessCommand>,
    mut session: ResMut<HarnessSession>,
    mut engine: ResMut<PatchEngine>,
    mut scene: ResMut<DemoScene>,
    mut sequencer: ResMut<Sequencer>,
    table: Res<CommandTable>,
    mut rng: ResMut<HarnessRng>,
) {
    let mut ctx = RunContext {
        engine: engine.0.as_mut(),
        scene: scene.0.as_mut(),
        sequencer: &mut sequencer,
        table: &table,
        rng: &mut rng.0,
    };
    for command in reader.read() {
        session.handle_command(command, &mut ctx);
    }
}

fn advance_sequencer(
    time: Res<Time>,
    mut session: ResMut<HarnessSession>,
    mut engine: ResMut<PatchEngine>,
    mut scene: ResMut<DemoScene>,
    mut sequencer: ResMut<Sequencer>,
    table: Res<CommandTable>,
    mut rng: ResMut<HarnessRng>,
) {
    let mut ctx = RunContext {
        engine: engine.0.as_mut(),
        scene: scene.0.as_mut(),
        sequencer: &mut sequencer,
        table: &table,
        rng: &mut rng.0,
    };
    session.run_due_step(time.delta(), &mut ctx);
}

fn update_scene(time: Res<Time>, mut scene: ResMut<DemoScene>) {
    scene.0.update(time.delta());
}

fn exit_when_done(
    config: Res<HarnessConfig>,
    pending: Res<PendingCommands>,
    sequencer: Res<Sequencer>,
    mut idle: ResMut<IdleFrames>,
    mut session: ResMut<HarnessSession>,
    mut engine: ResMut<PatchEngine>,
    mut exit: MessageWriter<AppExit>,
) {
    if !config.exit_when_done {
        return;
    }
    if !pending.0.is_empty() || sequencer.is_running() {
        idle.0 = 0;
        return;
    }

    idle.0 += 1;
    if idle.0 == IDLE_FRAMES_BEFORE_EXIT {
        session.teardown(engine.0.as_mut());
        exit.write(AppExit::Success);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::{RunSummary, SessionMode};
    use bevy::time::TimeUpdateStrategy;
    use std::time::Duration;
    use uuid::Uuid;

    fn test_app(exit_when_done: bool) -> (App, std::path::PathBuf) {
        let dir = std::env::temp_dir().join(format!("patchcheck_plugin_{}", Uuid::new_v4()));
        let config = HarnessConfig {
            results_dir: dir.clone(),
            exit_when_done,
            rng_seed: Some(3),
            ..Default::default()
        };

        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(16)));
        app.add_plugins(HarnessPlugin { config });
        (app, dir)
    }

    #[test]
    fn test_automated_run_through_app() {
        let (mut app, dir) = test_app(true);
        app.world_mut()
            .resource_mut::<PendingCommands>()
            .0
            .push_back(HarnessCommand::RunAutomatedTests);

        for _ in 0..500 {
            app.update();
            if app.should_exit().is_some() {
                break;
            }
        }

        let session = app.world().resource::<HarnessSession>();
        assert_eq!(session.mode(), SessionMode::Automated);
        assert_eq!(
            session.last_summary(),
            Some(RunSummary {
                passed: 12,
                failed: 0
            })
        );
        assert!(!session.is_started());
        assert_eq!(app.should_exit(), Some(AppExit::Success));
        assert!(app.world().resource::<Sequencer>().is_finished());

        let files: Vec<_> = std::fs::read_dir(&dir).unwrap().collect();
        assert_eq!(files.len(), 1);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_interactive_commands_through_app() {
        let (mut app, _dir) = test_app(false);
        {
            let mut pending = app.world_mut().resource_mut::<PendingCommands>();
            pending.0.push_back(HarnessCommand::MidiCc);
            pending.0.push_back(HarnessCommand::Message);
        }

        for _ in 0..4 {
            app.update();
        }

        let session = app.world().resource::<HarnessSession>();
        assert_eq!(session.mode(), SessionMode::Interactive);
        let lines: Vec<_> = session.console().lines().collect();
        assert_eq!(
            lines,
            vec![
                "MIDI CC: channel = 0; controller = 0; value = 127",
                "messageOut: test 1;"
            ]
        );
        assert_eq!(session.status_line(), "Sent messageIn: test 1;");
        assert!(app.should_exit().is_none());
    }
}
