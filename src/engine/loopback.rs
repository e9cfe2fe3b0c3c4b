//! Loopback engine that behaves like the harness test patch
//!
//! Every input is echoed to its matching output on the next
//! [`poll_events`](EngineAdapter::poll_events), and every call is kept in
//! order so tests can inspect exactly what was sent.

use std::collections::{HashMap, HashSet};

use crate::constants::*;

use super::{Atom, EngineAdapter, EngineError, EngineEvent};

/// One call made against the engine, in the order it happened
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Bind(String),
    Unbind(String),
    Bang { receiver: String },
    Float { receiver: String, value: f32 },
    Symbol { receiver: String, symbol: String },
    List { receiver: String, atoms: Vec<Atom> },
    Message { receiver: String, selector: String, atoms: Vec<Atom> },
    MidiNoteOn { channel: i32, pitch: i32, velocity: i32 },
    MidiCc { channel: i32, controller: i32, value: i32 },
    MidiProgramChange { channel: i32, program: i32 },
    MidiPitchBend { channel: i32, value: i32 },
    MidiAftertouch { channel: i32, value: i32 },
    MidiPolyAftertouch { channel: i32, pitch: i32, value: i32 },
    MidiByte { port: i32, value: i32 },
    MidiSysex { port: i32, value: i32 },
    MidiRealtime { port: i32, value: i32 },
    WriteArray { name: String, offset: usize, values: Vec<f32> },
    ReadArray { name: String, offset: usize, count: usize },
}

impl EngineCall {
    /// Short tag for order assertions and debug output
    pub fn tag(&self) -> &'static str {
        match self {
            EngineCall::Bind(_) => "bind",
            EngineCall::Unbind(_) => "unbind",
            EngineCall::Bang { .. } => "bang",
            EngineCall::Float { .. } => "float",
            EngineCall::Symbol { .. } => "symbol",
            EngineCall::List { .. } => "list",
            EngineCall::Message { .. } => "message",
            EngineCall::MidiNoteOn { .. } => "midi-note",
            EngineCall::MidiCc { .. } => "midi-cc",
            EngineCall::MidiProgramChange { .. } => "midi-program-change",
            EngineCall::MidiPitchBend { .. } => "midi-pitch-bend",
            EngineCall::MidiAftertouch { .. } => "midi-aftertouch",
            EngineCall::MidiPolyAftertouch { .. } => "midi-poly-aftertouch",
            EngineCall::MidiByte { .. } => "midi-byte",
            EngineCall::MidiSysex { .. } => "midi-sysex",
            EngineCall::MidiRealtime { .. } => "midi-realtime",
            EngineCall::WriteArray { .. } => "write-array",
            EngineCall::ReadArray { .. } => "read-array",
        }
    }
}

/// In-process stand-in for the patch engine
#[derive(Debug, Default)]
pub struct LoopbackEngine {
    calls: Vec<EngineCall>,
    /// Echoes waiting for the next poll
    pending: Vec<EngineEvent>,
    bound: HashSet<String>,
    arrays: HashMap<String, Vec<f32>>,
    /// When false nothing is ever echoed (engine not responding)
    echo: bool,
    /// Input receivers whose echo is dropped
    silenced: HashSet<String>,
    midi_silenced: bool,
}

impl LoopbackEngine {
    /// Loopback engine with the harness test array allocated
    pub fn new() -> Self {
        Self::bare().with_array(TEST_ARRAY_NAME, TEST_ARRAY_LEN)
    }

    /// Loopback engine with no arrays at all
    pub fn bare() -> Self {
        Self {
            echo: true,
            ..Default::default()
        }
    }

    /// Allocate a zeroed array
    pub fn with_array(mut self, name: &str, len: usize) -> Self {
        self.arrays.insert(name.to_string(), vec![0.0; len]);
        self
    }

    /// Engine that accepts everything and never answers
    pub fn without_echoes(mut self) -> Self {
        self.echo = false;
        self
    }

    /// Drop echoes for a single input receiver
    pub fn silence(mut self, receiver: &str) -> Self {
        self.silenced.insert(receiver.to_string());
        self
    }

    /// Drop all MIDI echoes
    pub fn silence_midi(mut self) -> Self {
        self.midi_silenced = true;
        self
    }

    /// Queue an arbitrary event for the next poll
    pub fn inject(&mut self, event: EngineEvent) {
        self.pending.push(event);
    }

    pub fn calls(&self) -> &[EngineCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn is_bound(&self, receiver: &str) -> bool {
        self.bound.contains(receiver)
    }

    pub fn array(&self, name: &str) -> Option<&[f32]> {
        self.arrays.get(name).map(|a| a.as_slice())
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Echo a named input to its output channel, if the output is bound
    fn echo_named(&mut self, receiver: &str, make: impl FnOnce(String) -> EngineEvent) {
        if !self.echo || self.silenced.contains(receiver) {
            return;
        }
        let output = match receiver {
            TRIGGER_IN => TRIGGER_OUT,
            FLOAT_IN => FLOAT_OUT,
            STRING_IN => STRING_OUT,
            LIST_IN => LIST_OUT,
            MESSAGE_IN => MESSAGE_OUT,
            _ => return,
        };
        if self.bound.contains(output) {
            self.pending.push(make(output.to_string()));
        }
    }

    fn echo_midi(&mut self, event: EngineEvent) {
        if self.echo && !self.midi_silenced {
            self.pending.push(event);
        }
    }

    fn array_range(
        &mut self,
        name: &str,
        offset: usize,
        count: usize,
    ) -> Result<&mut [f32], EngineError> {
        let array = self
            .arrays
            .get_mut(name)
            .ok_or_else(|| EngineError::ArrayNotFound(name.to_string()))?;
        let len = array.len();
        match offset.checked_add(count) {
            Some(end) if end <= len => Ok(&mut array[offset..end]),
            _ => Err(EngineError::OutOfRange {
                name: name.to_string(),
                offset,
                count,
                len,
            }),
        }
    }
}

impl EngineAdapter for LoopbackEngine {
    fn bind(&mut self, receiver: &str) {
        self.calls.push(EngineCall::Bind(receiver.to_string()));
        self.bound.insert(receiver.to_string());
    }

    fn unbind(&mut self, receiver: &str) {
        self.calls.push(EngineCall::Unbind(receiver.to_string()));
        self.bound.remove(receiver);
    }

    fn send_bang(&mut self, receiver: &str) {
        self.calls.push(EngineCall::Bang {
            receiver: receiver.to_string(),
        });
        self.echo_named(receiver, |source| EngineEvent::Bang { source });
    }

    fn send_float(&mut self, receiver: &str, value: f32) {
        self.calls.push(EngineCall::Float {
            receiver: receiver.to_string(),
            value,
        });
        self.echo_named(receiver, |source| EngineEvent::Float { source, value });
    }

    fn send_symbol(&mut self, receiver: &str, symbol: &str) {
        self.calls.push(EngineCall::Symbol {
            receiver: receiver.to_string(),
            symbol: symbol.to_string(),
        });
        self.echo_named(receiver, |source| EngineEvent::Symbol {
            source,
            symbol: symbol.to_string(),
        });
    }

    fn send_list(&mut self, receiver: &str, atoms: &[Atom]) {
        self.calls.push(EngineCall::List {
            receiver: receiver.to_string(),
            atoms: atoms.to_vec(),
        });
        self.echo_named(receiver, |source| EngineEvent::List {
            source,
            atoms: atoms.to_vec(),
        });
    }

    fn send_message(&mut self, receiver: &str, selector: &str, atoms: &[Atom]) {
        self.calls.push(EngineCall::Message {
            receiver: receiver.to_string(),
            selector: selector.to_string(),
            atoms: atoms.to_vec(),
        });
        self.echo_named(receiver, |source| EngineEvent::Message {
            source,
            selector: selector.to_string(),
            atoms: atoms.to_vec(),
        });
    }

    fn send_midi_note_on(&mut self, channel: i32, pitch: i32, velocity: i32) {
        self.calls.push(EngineCall::MidiNoteOn {
            channel,
            pitch,
            velocity,
        });
        self.echo_midi(EngineEvent::MidiNoteOn {
            channel,
            pitch,
            velocity,
        });
    }

    fn send_midi_cc(&mut self, channel: i32, controller: i32, value: i32) {
        self.calls.push(EngineCall::MidiCc {
            channel,
            controller,
            value,
        });
        self.echo_midi(EngineEvent::MidiCc {
            channel,
            controller,
            value,
        });
    }

    fn send_midi_program_change(&mut self, channel: i32, program: i32) {
        self.calls
            .push(EngineCall::MidiProgramChange { channel, program });
        self.echo_midi(EngineEvent::MidiProgramChange { channel, program });
    }

    fn send_midi_pitch_bend(&mut self, channel: i32, value: i32) {
        self.calls.push(EngineCall::MidiPitchBend { channel, value });
        self.echo_midi(EngineEvent::MidiPitchBend { channel, value });
    }

    fn send_midi_aftertouch(&mut self, channel: i32, value: i32) {
        self.calls.push(EngineCall::MidiAftertouch { channel, value });
        self.echo_midi(EngineEvent::MidiAftertouch { channel, value });
    }

    fn send_midi_poly_aftertouch(&mut self, channel: i32, pitch: i32, value: i32) {
        self.calls.push(EngineCall::MidiPolyAftertouch {
            channel,
            pitch,
            value,
        });
        self.echo_midi(EngineEvent::MidiPolyAftertouch {
            channel,
            pitch,
            value,
        });
    }

    fn send_midi_byte(&mut self, port: i32, value: i32) {
        self.calls.push(EngineCall::MidiByte { port, value });
        self.echo_midi(EngineEvent::MidiByte { port, value });
    }

    fn send_midi_sysex(&mut self, port: i32, value: i32) {
        self.calls.push(EngineCall::MidiSysex { port, value });
        self.echo_midi(EngineEvent::MidiByte { port, value });
    }

    fn send_midi_realtime(&mut self, port: i32, value: i32) {
        self.calls.push(EngineCall::MidiRealtime { port, value });
        self.echo_midi(EngineEvent::MidiByte { port, value });
    }

    fn write_array(&mut self, name: &str, offset: usize, values: &[f32]) -> Result<(), EngineError> {
        self.calls.push(EngineCall::WriteArray {
            name: name.to_string(),
            offset,
            values: values.to_vec(),
        });
        let range = self.array_range(name, offset, values.len())?;
        range.copy_from_slice(values);
        Ok(())
    }

    fn read_array(&mut self, out: &mut [f32], name: &str, offset: usize) -> Result<(), EngineError> {
        self.calls.push(EngineCall::ReadArray {
            name: name.to_string(),
            offset,
            count: out.len(),
        });
        let range = self.array_range(name, offset, out.len())?;
        out.copy_from_slice(range);
        Ok(())
    }

    fn poll_events(&mut self, out: &mut Vec<EngineEvent>) {
        out.append(&mut self.pending);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_echo_requires_binding() {
        let mut engine = LoopbackEngine::new();
        engine.send_bang(TRIGGER_IN);
        assert_eq!(engine.pending_count(), 0);

        engine.bind(TRIGGER_OUT);
        engine.send_bang(TRIGGER_IN);

        let mut events = Vec::new();
        engine.poll_events(&mut events);
        assert_eq!(
            events,
            vec![EngineEvent::Bang {
                source: TRIGGER_OUT.to_string()
            }]
        );
        assert_eq!(engine.pending_count(), 0);
    }

    #[test]
    fn test_sysex_and_realtime_echo_as_bytes() {
        let mut engine = LoopbackEngine::new();
        engine.send_midi_sysex(0, 127);
        engine.send_midi_realtime(0, 250);

        let mut events = Vec::new();
        engine.poll_events(&mut events);
        assert_eq!(
            events,
            vec![
                EngineEvent::MidiByte { port: 0, value: 127 },
                EngineEvent::MidiByte { port: 0, value: 250 },
            ]
        );
    }

    #[test]
    fn test_silenced_engine_records_calls() {
        let mut engine = LoopbackEngine::new().without_echoes();
        engine.bind(MESSAGE_OUT);
        engine.send_message(MESSAGE_IN, "test", &[Atom::Float(1.0)]);
        engine.send_midi_cc(0, 0, 127);

        assert_eq!(engine.pending_count(), 0);
        let tags: Vec<_> = engine.calls().iter().map(EngineCall::tag).collect();
        assert_eq!(tags, vec!["bind", "message", "midi-cc"]);
    }

    #[test]
    fn test_array_write_read() {
        let mut engine = LoopbackEngine::new();
        engine.write_array(TEST_ARRAY_NAME, 2, &[0.25, -0.5]).unwrap();

        let mut out = [0.0; 4];
        engine.read_array(&mut out, TEST_ARRAY_NAME, 1).unwrap();
        assert_eq!(out, [0.0, 0.25, -0.5, 0.0]);
    }

    #[test]
    fn test_array_errors() {
        let mut engine = LoopbackEngine::bare().with_array("small", 3);
        assert_eq!(
            engine.write_array("missing", 0, &[1.0]),
            Err(EngineError::ArrayNotFound("missing".to_string()))
        );

        let mut out = [0.0; 4];
        let err = engine.read_array(&mut out, "small", 0).unwrap_err();
        assert!(matches!(err, EngineError::OutOfRange { len: 3, count: 4, .. }));
        assert_eq!(out, [0.0; 4]);
    }

    #[test]
    fn test_offset_past_usize_is_out_of_range() {
        let mut engine = LoopbackEngine::bare().with_array("small", 3);
        let err = engine.write_array("small", usize::MAX, &[1.0]).unwrap_err();
        assert!(matches!(
            err,
            EngineError::OutOfRange { offset: usize::MAX, count: 1, len: 3, .. }
        ));

        let mut out = [0.0; 2];
        let err = engine.read_array(&mut out, "small", usize::MAX - 1).unwrap_err();
        assert!(matches!(err, EngineError::OutOfRange { count: 2, .. }));
    }
}
