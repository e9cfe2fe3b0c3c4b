//! patchcheck - test harness for an embedded patch engine
//!
//! Sends a fixed catalog of stimuli (messages, MIDI, array writes) through an
//! [`EngineAdapter`], verifies each echo against the exact text of what was
//! sent and mirrors the run to a console log and a results file.

pub mod cli;
pub mod commands;
pub mod config;
pub mod constants;
pub mod echo;
pub mod engine;
pub mod harness;
pub mod plugin;
pub mod scene;
pub mod stimulus;

// Re-export commonly used types for convenience
pub use cli::CliArgs;
pub use commands::{CommandAction, CommandKind, CommandTable, HandlerContext, HarnessCommand};
pub use config::HarnessConfig;
pub use constants::*;
pub use echo::{Echo, EchoRoute, EchoRoutes};
pub use engine::{Atom, EngineAdapter, EngineCall, EngineError, EngineEvent, LoopbackEngine};
pub use harness::{
    ArrayCheckReport, ConsoleLog, HarnessSession, RunContext, RunSummary, Sequencer,
    SequencerState, SessionMode, SessionRecorder, Step, TestOutcome, TestStatus, Verifier,
};
pub use plugin::{DemoScene, HarnessPlugin, HarnessRng, PatchEngine, PendingCommands};
pub use scene::{HeadlessScene, Orbit, SceneCall, SceneHooks};
pub use stimulus::Stimulus;
