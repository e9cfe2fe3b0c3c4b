//! Engine adapter boundary
//!
//! The harness only ever talks to the patch engine through [`EngineAdapter`].
//! Sends are fire-and-forget; anything the engine emits comes back through
//! [`EngineAdapter::poll_events`], which the harness pumps once per frame.

mod loopback;

pub use loopback::{EngineCall, LoopbackEngine};

use std::fmt;

/// A single list/message argument
#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    Float(f32),
    Symbol(String),
}

impl Atom {
    pub fn symbol(s: impl Into<String>) -> Self {
        Atom::Symbol(s.into())
    }
}

impl From<f32> for Atom {
    fn from(value: f32) -> Self {
        Atom::Float(value)
    }
}

impl From<&str> for Atom {
    fn from(value: &str) -> Self {
        Atom::Symbol(value.to_string())
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Float(v) => write!(f, "{}", v),
            Atom::Symbol(s) => write!(f, "{}", s),
        }
    }
}

/// Something the engine emitted on one of its outputs
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Bang { source: String },
    Float { source: String, value: f32 },
    Symbol { source: String, symbol: String },
    List { source: String, atoms: Vec<Atom> },
    Message { source: String, selector: String, atoms: Vec<Atom> },
    MidiNoteOn { channel: i32, pitch: i32, velocity: i32 },
    MidiCc { channel: i32, controller: i32, value: i32 },
    MidiProgramChange { channel: i32, program: i32 },
    MidiPitchBend { channel: i32, value: i32 },
    MidiAftertouch { channel: i32, value: i32 },
    MidiPolyAftertouch { channel: i32, pitch: i32, value: i32 },
    /// Raw MIDI byte; sysex and realtime output also arrive this way
    MidiByte { port: i32, value: i32 },
}

/// Failures reported by array storage access
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    ArrayNotFound(String),
    OutOfRange {
        name: String,
        offset: usize,
        count: usize,
        len: usize,
    },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::ArrayNotFound(name) => write!(f, "array '{}' not found", name),
            EngineError::OutOfRange {
                name,
                offset,
                count,
                len,
            } => write!(
                f,
                "array '{}' has {} elements, cannot access {} at offset {}",
                name, len, count, offset
            ),
        }
    }
}

impl std::error::Error for EngineError {}

/// Typed send/receive surface of the patch engine.
///
/// Implementations live outside the harness core (a real engine binding, or
/// [`LoopbackEngine`] for headless runs and tests).
pub trait EngineAdapter: Send + Sync {
    /// Subscribe to a named engine-side output
    fn bind(&mut self, receiver: &str);
    fn unbind(&mut self, receiver: &str);

    fn send_bang(&mut self, receiver: &str);
    fn send_float(&mut self, receiver: &str, value: f32);
    fn send_symbol(&mut self, receiver: &str, symbol: &str);
    fn send_list(&mut self, receiver: &str, atoms: &[Atom]);
    fn send_message(&mut self, receiver: &str, selector: &str, atoms: &[Atom]);

    fn send_midi_note_on(&mut self, channel: i32, pitch: i32, velocity: i32);
    fn send_midi_cc(&mut self, channel: i32, controller: i32, value: i32);
    fn send_midi_program_change(&mut self, channel: i32, program: i32);
    fn send_midi_pitch_bend(&mut self, channel: i32, value: i32);
    fn send_midi_aftertouch(&mut self, channel: i32, value: i32);
    fn send_midi_poly_aftertouch(&mut self, channel: i32, pitch: i32, value: i32);
    fn send_midi_byte(&mut self, port: i32, value: i32);
    fn send_midi_sysex(&mut self, port: i32, value: i32);
    fn send_midi_realtime(&mut self, port: i32, value: i32);

    /// Write `values` into the named array starting at `offset`
    fn write_array(&mut self, name: &str, offset: usize, values: &[f32]) -> Result<(), EngineError>;
    /// Fill `out` from the named array starting at `offset`
    fn read_array(&mut self, out: &mut [f32], name: &str, offset: usize) -> Result<(), EngineError>;

    /// Move every event the engine produced since the last call into `out`
    fn poll_events(&mut self, out: &mut Vec<EngineEvent>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atom_display() {
        assert_eq!(Atom::Float(0.0).to_string(), "0");
        assert_eq!(Atom::Float(15.99).to_string(), "15.99");
        assert_eq!(Atom::from("test").to_string(), "test");
    }

    #[test]
    fn test_engine_error_display() {
        let err = EngineError::ArrayNotFound("TestArray".to_string());
        assert_eq!(err.to_string(), "array 'TestArray' not found");
    }
}
