//! Stimulus sequencer - fixed catalog stepped one frame at a time
//!
//! The sequencer never sends anything itself. Each frame the host calls
//! [`Sequencer::next_due`] with the frame delta; when a step is due the host
//! builds its stimulus, records the expectation with [`Sequencer::expect`]
//! and sends it. Between steps the sequencer waits exactly one frame, except
//! before the dynamic-deletion step where it waits a fixed wall-clock delay.
//!
//! Runs cannot be cancelled once started.

use bevy::prelude::*;
use std::time::Duration;

use crate::commands::HarnessCommand;
use crate::constants::*;

/// One entry of the automated catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Bang,
    List,
    Message,
    Float,
    Symbol,
    MidiNoteOn,
    MidiCc,
    MidiProgramChange,
    MidiPitchBend,
    MidiAftertouch,
    MidiPolyAftertouch,
    MidiByte,
    MidiSysex,
    MidiRealtime,
    ArrayRandom,
    ArraySine,
    Spatialise,
    DynamicCreate,
    DynamicDelete,
}

/// How long to suspend after a step before issuing the next one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// Until the next frame
    Tick,
    /// Until the configured wall-clock delay has elapsed
    Delay,
}

impl Step {
    /// The automated run, in order
    pub const CATALOG: [Step; 19] = [
        Step::Bang,
        Step::List,
        Step::Message,
        Step::Float,
        Step::Symbol,
        Step::MidiNoteOn,
        Step::MidiCc,
        Step::MidiProgramChange,
        Step::MidiPitchBend,
        Step::MidiAftertouch,
        Step::MidiPolyAftertouch,
        Step::MidiByte,
        Step::MidiSysex,
        Step::MidiRealtime,
        Step::ArrayRandom,
        Step::ArraySine,
        Step::Spatialise,
        Step::DynamicCreate,
        Step::DynamicDelete,
    ];

    /// Command the step issues through the command table
    pub fn command(self) -> HarnessCommand {
        match self {
            Step::Bang => HarnessCommand::Bang,
            Step::List => HarnessCommand::List,
            Step::Message => HarnessCommand::Message,
            Step::Float => HarnessCommand::Float(AUTOMATED_FLOAT),
            Step::Symbol => HarnessCommand::Symbol(AUTOMATED_SYMBOL.to_string()),
            Step::MidiNoteOn => HarnessCommand::MidiNote,
            Step::MidiCc => HarnessCommand::MidiCc,
            Step::MidiProgramChange => HarnessCommand::MidiProgramChange,
            Step::MidiPitchBend => HarnessCommand::MidiPitchBend,
            Step::MidiAftertouch => HarnessCommand::MidiAftertouch,
            Step::MidiPolyAftertouch => HarnessCommand::MidiPolyAftertouch,
            Step::MidiByte => HarnessCommand::MidiByte,
            Step::MidiSysex => HarnessCommand::MidiSysex,
            Step::MidiRealtime => HarnessCommand::MidiRealtime,
            Step::ArrayRandom => HarnessCommand::ArrayRandom,
            Step::ArraySine => HarnessCommand::ArraySine,
            Step::Spatialise => HarnessCommand::Spatialise,
            // The toggle flips the instance state, create then delete
            Step::DynamicCreate | Step::DynamicDelete => HarnessCommand::DynamicToggle,
        }
    }

    /// Suspension after this step
    pub fn wait_after(self) -> Wait {
        match self {
            // Give the created instance time to run before deleting it
            Step::DynamicCreate => Wait::Delay,
            _ => Wait::Tick,
        }
    }
}

/// Progress of the current run. Written by the sequencer, read by the verifier.
#[derive(Debug, Clone, Default)]
pub struct SequencerState {
    current_step_index: usize,
    awaiting_echo: bool,
    last_expected_text: Option<String>,
}

impl SequencerState {
    pub fn current_step_index(&self) -> usize {
        self.current_step_index
    }

    pub fn awaiting_echo(&self) -> bool {
        self.awaiting_echo
    }

    pub fn last_expected_text(&self) -> Option<&str> {
        self.last_expected_text.as_deref()
    }

    pub(crate) fn expect(&mut self, text: impl Into<String>) {
        self.last_expected_text = Some(text.into());
        self.awaiting_echo = true;
    }

    pub(crate) fn echo_received(&mut self) {
        self.awaiting_echo = false;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Idle,
    /// `next` is the catalog index of the next step; `pending` is the
    /// suspension still to complete before it (None right after start)
    Running {
        next: usize,
        pending: Option<Pending>,
    },
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Pending {
    Tick,
    Delay { waited: Duration },
}

#[derive(Resource, Debug)]
pub struct Sequencer {
    phase: Phase,
    state: SequencerState,
    delete_delay: Duration,
    /// Steps issued in the current run
    history: Vec<Step>,
    completed_runs: u32,
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new(DYNAMIC_DELETE_DELAY)
    }
}

impl Sequencer {
    pub fn new(delete_delay: Duration) -> Self {
        Self {
            phase: Phase::Idle,
            state: SequencerState::default(),
            delete_delay,
            history: Vec::new(),
            completed_runs: 0,
        }
    }

    /// Begin a run. Refused while a run is in progress.
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            warn!("Automated run already in progress, ignoring start");
            return false;
        }
        self.phase = Phase::Running {
            next: 0,
            pending: None,
        };
        self.state = SequencerState::default();
        self.history.clear();
        info!("Starting automated run ({} steps)", Step::CATALOG.len());
        true
    }

    /// Advance by one frame. Returns the step that must be issued now, if any.
    pub fn next_due(&mut self, delta: Duration) -> Option<Step> {
        let Phase::Running { next, pending } = self.phase else {
            return None;
        };

        let ready = match pending {
            None | Some(Pending::Tick) => true,
            Some(Pending::Delay { waited }) => {
                let waited = waited + delta;
                if waited < self.delete_delay {
                    self.phase = Phase::Running {
                        next,
                        pending: Some(Pending::Delay { waited }),
                    };
                }
                waited >= self.delete_delay
            }
        };
        if !ready {
            return None;
        }

        if self.state.awaiting_echo {
            debug!(
                "No echo for step {} before moving on",
                self.state.current_step_index
            );
            self.state.awaiting_echo = false;
        }

        let Some(&step) = Step::CATALOG.get(next) else {
            self.phase = Phase::Finished;
            self.completed_runs += 1;
            info!("Automated run finished");
            return None;
        };

        self.state.current_step_index = next;
        self.history.push(step);
        self.phase = Phase::Running {
            next: next + 1,
            pending: Some(match step.wait_after() {
                Wait::Tick => Pending::Tick,
                Wait::Delay => Pending::Delay {
                    waited: Duration::ZERO,
                },
            }),
        };
        Some(step)
    }

    /// Record the canonical text of the stimulus about to be sent
    pub fn expect(&mut self, text: impl Into<String>, awaits_echo: bool) {
        self.state.expect(text);
        if !awaits_echo {
            self.state.awaiting_echo = false;
        }
    }

    pub fn echo_received(&mut self) {
        self.state.echo_received();
    }

    pub fn state(&self) -> &SequencerState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.phase, Phase::Running { .. })
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    pub fn history(&self) -> &[Step] {
        &self.history
    }

    pub fn completed_runs(&self) -> u32 {
        self.completed_runs
    }

    pub fn delete_delay(&self) -> Duration {
        self.delete_delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: Duration = Duration::from_millis(16);

    /// Drive the sequencer frame by frame, returning (frame, step) pairs
    fn run_frames(sequencer: &mut Sequencer, delta: Duration, max_frames: usize) -> Vec<(usize, Step)> {
        let mut issued = Vec::new();
        for frame in 0..max_frames {
            if let Some(step) = sequencer.next_due(delta) {
                sequencer.expect(format!("{:?}", step), true);
                issued.push((frame, step));
            }
            if sequencer.is_finished() {
                break;
            }
        }
        issued
    }

    #[test]
    fn test_idle_issues_nothing() {
        let mut sequencer = Sequencer::default();
        assert_eq!(sequencer.next_due(FRAME), None);
        assert!(!sequencer.is_running());
    }

    #[test]
    fn test_catalog_order() {
        let mut sequencer = Sequencer::default();
        assert!(sequencer.start());
        let issued = run_frames(&mut sequencer, FRAME, 1000);

        let steps: Vec<Step> = issued.iter().map(|(_, s)| *s).collect();
        assert_eq!(steps, Step::CATALOG.to_vec());
        assert_eq!(sequencer.history(), &Step::CATALOG[..]);
        assert!(sequencer.is_finished());
        assert_eq!(sequencer.completed_runs(), 1);
    }

    #[test]
    fn test_one_tick_between_ordinary_steps() {
        let mut sequencer = Sequencer::default();
        sequencer.start();
        let issued = run_frames(&mut sequencer, FRAME, 1000);

        for pair in issued.windows(2) {
            let (frame_a, step_a) = pair[0];
            let (frame_b, _) = pair[1];
            if step_a != Step::DynamicCreate {
                assert_eq!(frame_b - frame_a, 1, "after {:?}", step_a);
            }
        }
    }

    #[test]
    fn test_delay_before_dynamic_delete() {
        let mut sequencer = Sequencer::default();
        sequencer.start();
        let issued = run_frames(&mut sequencer, FRAME, 1000);

        let create = issued.iter().find(|(_, s)| *s == Step::DynamicCreate).unwrap().0;
        let delete = issued.iter().find(|(_, s)| *s == Step::DynamicDelete).unwrap().0;
        let waited = FRAME * (delete - create) as u32;
        assert!(waited >= DYNAMIC_DELETE_DELAY);
        // First frame at which the delay is satisfied, not later
        assert!(waited - FRAME < DYNAMIC_DELETE_DELAY);
    }

    #[test]
    fn test_delay_with_uneven_frames() {
        let mut sequencer = Sequencer::new(Duration::from_secs(1));
        sequencer.start();
        // Skip to the create step
        while sequencer.next_due(FRAME) != Some(Step::DynamicCreate) {}

        assert_eq!(sequencer.next_due(Duration::from_millis(600)), None);
        assert_eq!(sequencer.next_due(Duration::from_millis(399)), None);
        assert_eq!(
            sequencer.next_due(Duration::from_millis(1)),
            Some(Step::DynamicDelete)
        );
    }

    #[test]
    fn test_start_refused_while_running() {
        let mut sequencer = Sequencer::default();
        assert!(sequencer.start());
        sequencer.next_due(FRAME);
        assert!(!sequencer.start());
        assert_eq!(sequencer.history(), &[Step::Bang]);
    }

    #[test]
    fn test_restart_after_finish() {
        let mut sequencer = Sequencer::default();
        sequencer.start();
        run_frames(&mut sequencer, FRAME, 1000);
        assert!(sequencer.start());
        assert_eq!(sequencer.next_due(FRAME), Some(Step::Bang));
        assert_eq!(sequencer.history().len(), 1);
    }

    #[test]
    fn test_expectation_tracking() {
        let mut sequencer = Sequencer::default();
        sequencer.start();
        let step = sequencer.next_due(FRAME).unwrap();
        sequencer.expect("bang", true);

        assert_eq!(step, Step::Bang);
        assert_eq!(sequencer.state().last_expected_text(), Some("bang"));
        assert!(sequencer.state().awaiting_echo());

        sequencer.echo_received();
        assert!(!sequencer.state().awaiting_echo());

        // Missing echo for the next step is not fatal
        sequencer.next_due(FRAME);
        sequencer.expect("0; 15.99; test;", true);
        assert_eq!(sequencer.next_due(FRAME), Some(Step::Message));
        assert_eq!(sequencer.state().current_step_index(), 2);
    }

    #[test]
    fn test_dynamic_steps_share_toggle_command() {
        assert_eq!(Step::DynamicCreate.command(), HarnessCommand::DynamicToggle);
        assert_eq!(Step::DynamicDelete.command(), HarnessCommand::DynamicToggle);
        assert_eq!(Step::Float.command(), HarnessCommand::Float(0.5));
    }
}
