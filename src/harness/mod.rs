//! Automated run machinery
//!
//! The sequencer issues stimuli, the verifier classifies echoes, and the
//! session context owns everything run-scoped: mode, console, recorder,
//! outcomes and echo subscriptions.

pub mod array_check;
mod console;
mod recorder;
mod sequencer;
mod session;
mod verifier;

pub use array_check::{ArrayCheckReport, check, plot_points};
pub use console::ConsoleLog;
pub use recorder::{OpenOutcome, SessionRecorder, results_file_name};
pub use sequencer::{Sequencer, SequencerState, Step, Wait};
pub use session::{HarnessSession, RunContext, RunSummary, SessionMode};
pub use verifier::{TestOutcome, TestStatus, Verifier};
