//! Session context - everything scoped to one harness session
//!
//! Interactive mode shows the last stimulus on the status line and appends
//! echoes raw to the console. Automated mode records every stimulus and echo
//! to the results file and verifies echoes against the sequencer's last
//! expectation. Once automated mode is entered it stays on, and the results
//! file stays open until teardown.

use bevy::prelude::*;
use chrono::Local;
use rand::rngs::StdRng;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::commands::{CommandAction, CommandTable, HandlerContext, HarnessCommand};
use crate::config::HarnessConfig;
use crate::constants::RECEIVE_CHANNELS;
use crate::echo::{Echo, EchoRoute, EchoRoutes};
use crate::engine::{EngineAdapter, EngineEvent};
use crate::scene::SceneHooks;
use crate::stimulus::Stimulus;

use super::array_check;
use super::console::ConsoleLog;
use super::recorder::{OpenOutcome, SessionRecorder, results_file_name};
use super::sequencer::{Sequencer, Step};
use super::verifier::{TestOutcome, Verifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionMode {
    #[default]
    Interactive,
    Automated,
}

/// Pass/fail counts of a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub passed: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Completed: {} passed, {} failed", self.passed, self.failed)
    }
}

/// Collaborators every session operation works against
pub struct RunContext<'a> {
    pub engine: &'a mut dyn EngineAdapter,
    pub scene: &'a mut dyn SceneHooks,
    pub sequencer: &'a mut Sequencer,
    pub table: &'a CommandTable,
    pub rng: &'a mut StdRng,
}

#[derive(Resource, Debug)]
pub struct HarnessSession {
    mode: SessionMode,
    console: ConsoleLog,
    recorder: SessionRecorder,
    status_line: String,
    outcomes: Vec<TestOutcome>,
    /// Index into `outcomes` where the current run began
    run_start: usize,
    last_summary: Option<RunSummary>,
    routes: EchoRoutes,
    route_scalar_echoes: bool,
    started: bool,
    dynamic_instance_alive: bool,
    results_dir: PathBuf,
}

impl Default for HarnessSession {
    fn default() -> Self {
        Self::from_config(&HarnessConfig::default())
    }
}

impl HarnessSession {
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self {
            mode: SessionMode::Interactive,
            console: ConsoleLog::with_capacity(config.console_capacity),
            recorder: SessionRecorder::new(),
            status_line: String::new(),
            outcomes: Vec::new(),
            run_start: 0,
            last_summary: None,
            routes: EchoRoutes::default(),
            route_scalar_echoes: config.route_scalar_echoes,
            started: false,
            dynamic_instance_alive: false,
            results_dir: config.results_dir.clone(),
        }
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Bind the receive channels and subscribe to echo routes
    pub fn start(&mut self, engine: &mut dyn EngineAdapter) {
        if self.started {
            return;
        }
        for channel in RECEIVE_CHANNELS {
            engine.bind(channel);
        }
        self.routes.register_all(EchoRoute::DEFAULT);
        if self.route_scalar_echoes {
            self.routes.register_all(EchoRoute::SCALAR);
        }
        self.started = true;
        info!("Harness session started");
    }

    /// Undo `start` and release the results file
    pub fn teardown(&mut self, engine: &mut dyn EngineAdapter) {
        if !self.started {
            return;
        }
        for channel in RECEIVE_CHANNELS {
            engine.unbind(channel);
        }
        self.routes.clear();
        self.recorder.close();
        self.started = false;
        info!("Harness session torn down");
    }

    // =========================================================================
    // COMMANDS AND STEPS
    // =========================================================================

    /// Dispatch one command through the table and act on the result
    pub fn handle_command(&mut self, command: &HarnessCommand, ctx: &mut RunContext<'_>) {
        let action = {
            let mut handler_ctx = HandlerContext {
                rng: &mut *ctx.rng,
                dynamic_instance_alive: self.dynamic_instance_alive,
            };
            ctx.table.dispatch(command, &mut handler_ctx)
        };

        match action {
            Some(CommandAction::Issue(stimulus)) => self.execute_stimulus(stimulus, ctx),
            Some(CommandAction::StartAutomatedRun) => {
                self.start_automated_run(ctx.sequencer);
            }
            None => warn!("No handler registered for '{}'", command.kind().name()),
        }
    }

    /// Open the results file, switch to automated mode and start the sequencer
    pub fn start_automated_run(&mut self, sequencer: &mut Sequencer) -> bool {
        if sequencer.is_running() {
            warn!("Automated run already in progress");
            return false;
        }

        // Each run gets its own file; the previous run's file stays open until now
        self.recorder.close();
        let path = self
            .results_dir
            .join(results_file_name(Local::now().naive_local()));
        match self.recorder.open_for_run(&path) {
            Ok(OpenOutcome::Created(_)) => {}
            Ok(OpenOutcome::AlreadyStarted) => warn!("{} already exists", path.display()),
            Err(e) => warn!("Failed to create results file {}: {}", path.display(), e),
        }

        self.mode = SessionMode::Automated;
        self.run_start = self.outcomes.len();
        self.last_summary = None;
        sequencer.start()
    }

    /// Advance the sequencer by one frame, issuing the step that falls due
    pub fn run_due_step(&mut self, delta: Duration, ctx: &mut RunContext<'_>) -> Option<Step> {
        let was_running = ctx.sequencer.is_running();
        let step = ctx.sequencer.next_due(delta);

        let Some(step) = step else {
            if was_running && ctx.sequencer.is_finished() {
                self.finish_run();
            }
            return None;
        };

        let action = {
            let mut handler_ctx = HandlerContext {
                rng: &mut *ctx.rng,
                dynamic_instance_alive: self.dynamic_instance_alive,
            };
            ctx.table.dispatch(&step.command(), &mut handler_ctx)
        };

        match action {
            Some(CommandAction::Issue(stimulus)) => self.execute_stimulus(stimulus, ctx),
            _ => warn!("Step {:?} produced no stimulus", step),
        }
        Some(step)
    }

    /// Send or route a stimulus and record it. In automated mode it also
    /// becomes the expectation the next echo is verified against.
    pub fn execute_stimulus(&mut self, stimulus: Stimulus, ctx: &mut RunContext<'_>) {
        if self.mode == SessionMode::Automated {
            ctx.sequencer
                .expect(stimulus.canonical_text(), stimulus.expects_echo());
        }
        self.write_input(&stimulus);
        if stimulus.send_to(ctx.engine) {
            return;
        }

        match &stimulus {
            Stimulus::ArrayWrite {
                array,
                offset,
                samples,
            }
            | Stimulus::ArraySineWrite {
                array,
                offset,
                samples,
            } => {
                let report = array_check::check(ctx.engine, array, *offset, samples);
                ctx.scene.plot_array(&report.plot_points());

                let kind = match stimulus {
                    Stimulus::ArrayWrite { .. } => "Random",
                    _ => "Sine",
                };
                let received = format!("Received {} array: {}", kind, report.received_text());
                match self.mode {
                    SessionMode::Automated => {
                        self.recorder.write_line(&received);
                        let outcome = Verifier.compare(
                            stimulus.label(),
                            &report.sent_text(),
                            &report.received_text(),
                        );
                        self.push_outcome(outcome);
                    }
                    SessionMode::Interactive => self.console.append(received),
                }
            }
            Stimulus::SpatialiseTrigger => ctx.scene.trigger_spatialise(),
            Stimulus::DynamicToggle { create: true } => {
                ctx.scene.create_dynamic_instance();
                self.dynamic_instance_alive = true;
            }
            Stimulus::DynamicToggle { create: false } => {
                if !ctx.scene.delete_dynamic_instance() {
                    warn!("No dynamic instance to delete");
                }
                self.dynamic_instance_alive = false;
            }
            _ => {}
        }
    }

    fn write_input(&mut self, stimulus: &Stimulus) {
        let line = format!("{}{}", stimulus.preamble(), stimulus.canonical_text());
        match self.mode {
            SessionMode::Automated => self.recorder.write_line(&line),
            SessionMode::Interactive => self.status_line = line,
        }
    }

    // =========================================================================
    // ECHOES
    // =========================================================================

    /// Drain the engine's event pump and handle every subscribed echo.
    /// Returns how many echoes were accepted.
    pub fn deliver_echoes(&mut self, ctx: &mut RunContext<'_>) -> usize {
        let mut events: Vec<EngineEvent> = Vec::new();
        ctx.engine.poll_events(&mut events);

        let mut accepted = 0;
        for event in &events {
            let Some(echo) = self.routes.accept(event) else {
                continue;
            };
            accepted += 1;
            self.on_echo(echo, ctx.sequencer);
        }
        accepted
    }

    fn on_echo(&mut self, echo: Echo, sequencer: &mut Sequencer) {
        let line = format!("{}{}", echo.preamble(), echo.text);
        match self.mode {
            SessionMode::Interactive => self.console.append(line),
            SessionMode::Automated => {
                self.recorder.write_line(&line);
                if let Some(outcome) = Verifier.on_echo(echo.label(), &echo.text, sequencer.state())
                {
                    self.push_outcome(outcome);
                    sequencer.echo_received();
                }
            }
        }
    }

    fn push_outcome(&mut self, outcome: TestOutcome) {
        for line in outcome.console_lines() {
            if !outcome.passed() {
                self.recorder.write_line(&line);
            }
            self.console.append(line);
        }
        self.outcomes.push(outcome);
    }

    fn finish_run(&mut self) {
        let run = &self.outcomes[self.run_start..];
        let passed = run.iter().filter(|o| o.passed()).count();
        let summary = RunSummary {
            passed,
            failed: run.len() - passed,
        };

        info!("Automated run complete: {} passed, {} failed", summary.passed, summary.failed);
        for outcome in run.iter().filter(|o| !o.passed()) {
            warn!(
                "{} FAILED: expected '{}', received '{}'",
                outcome.label, outcome.expected_text, outcome.received_text
            );
        }

        self.console.append(summary.to_string());
        self.recorder.write_line(&summary.to_string());
        self.last_summary = Some(summary);
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn console(&self) -> &ConsoleLog {
        &self.console
    }

    pub fn status_line(&self) -> &str {
        &self.status_line
    }

    pub fn outcomes(&self) -> &[TestOutcome] {
        &self.outcomes
    }

    /// Summary of the last finished automated run
    pub fn last_summary(&self) -> Option<RunSummary> {
        self.last_summary
    }

    pub fn recorder(&self) -> &SessionRecorder {
        &self.recorder
    }

    pub fn routes(&self) -> &EchoRoutes {
        &self.routes
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn dynamic_instance_alive(&self) -> bool {
        self.dynamic_instance_alive
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }
}
