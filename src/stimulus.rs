//! Stimuli issued to the engine and their canonical text form
//!
//! The canonical text of a stimulus is what the matching echo must reproduce
//! exactly for the comparison to pass.

use rand::Rng;
use std::f32::consts::PI;

use crate::constants::*;
use crate::engine::{Atom, EngineAdapter};

/// A single outbound command, carrying everything needed to reproduce the call
#[derive(Debug, Clone, PartialEq)]
pub enum Stimulus {
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
    /// Random samples written to named storage
    ArrayWrite { array: String, offset: usize, samples: Vec<f32> },
    /// One period of a sine written to named storage
    ArraySineWrite { array: String, offset: usize, samples: Vec<f32> },
    SpatialiseTrigger,
    DynamicToggle { create: bool },
}

impl Stimulus {
    pub fn bang() -> Self {
        Stimulus::Bang {
            receiver: TRIGGER_IN.to_string(),
        }
    }

    pub fn float(value: f32) -> Self {
        Stimulus::Float {
            receiver: FLOAT_IN.to_string(),
            value,
        }
    }

    pub fn symbol(symbol: impl Into<String>) -> Self {
        Stimulus::Symbol {
            receiver: STRING_IN.to_string(),
            symbol: symbol.into(),
        }
    }

    /// The harness list: `0 15.99 test`
    pub fn test_list() -> Self {
        Stimulus::List {
            receiver: LIST_IN.to_string(),
            atoms: vec![Atom::Float(0.0), Atom::Float(15.99), Atom::symbol("test")],
        }
    }

    /// The harness message: `test 1`
    pub fn test_message() -> Self {
        Stimulus::Message {
            receiver: MESSAGE_IN.to_string(),
            selector: "test".to_string(),
            atoms: vec![Atom::Float(1.0)],
        }
    }

    /// Ten independent samples in [-1, 1)
    pub fn random_array(rng: &mut impl Rng) -> Self {
        let samples = (0..TEST_ARRAY_LEN)
            .map(|_| rng.gen_range(-1.0f32..1.0))
            .collect();
        Stimulus::ArrayWrite {
            array: TEST_ARRAY_NAME.to_string(),
            offset: TEST_ARRAY_OFFSET,
            samples,
        }
    }

    /// One full sine period sampled at ten points (first and last both zero phase)
    pub fn sine_array() -> Self {
        let last = (TEST_ARRAY_LEN - 1) as f32;
        let samples = (0..TEST_ARRAY_LEN)
            .map(|i| ((i as f32 / last) * 2.0 * PI).sin())
            .collect();
        Stimulus::ArraySineWrite {
            array: TEST_ARRAY_NAME.to_string(),
            offset: TEST_ARRAY_OFFSET,
            samples,
        }
    }

    /// Text the matching echo must reproduce
    pub fn canonical_text(&self) -> String {
        match self {
            Stimulus::Bang { .. } => "bang".to_string(),
            Stimulus::Float { value, .. } => value.to_string(),
            Stimulus::Symbol { symbol, .. } => symbol.clone(),
            Stimulus::List { atoms, .. } => list_text(atoms),
            Stimulus::Message {
                selector, atoms, ..
            } => message_text(selector, atoms),
            Stimulus::MidiNoteOn {
                channel,
                pitch,
                velocity,
            } => note_text(*channel, *pitch, *velocity),
            Stimulus::MidiCc {
                channel,
                controller,
                value,
            } => cc_text(*channel, *controller, *value),
            Stimulus::MidiProgramChange { channel, program } => {
                program_text(*channel, *program)
            }
            Stimulus::MidiPitchBend { channel, value }
            | Stimulus::MidiAftertouch { channel, value } => channel_value_text(*channel, *value),
            Stimulus::MidiPolyAftertouch {
                channel,
                pitch,
                value,
            } => poly_text(*channel, *pitch, *value),
            Stimulus::MidiByte { port, value }
            | Stimulus::MidiSysex { port, value }
            | Stimulus::MidiRealtime { port, value } => port_value_text(*port, *value),
            Stimulus::ArrayWrite { samples, .. } | Stimulus::ArraySineWrite { samples, .. } => {
                samples_text(samples)
            }
            Stimulus::SpatialiseTrigger => "spatialise".to_string(),
            Stimulus::DynamicToggle { create: true } => "create".to_string(),
            Stimulus::DynamicToggle { create: false } => "delete".to_string(),
        }
    }

    /// Prefix written ahead of the canonical text in the status line and record
    pub fn preamble(&self) -> String {
        match self {
            Stimulus::Bang { receiver }
            | Stimulus::Float { receiver, .. }
            | Stimulus::Symbol { receiver, .. }
            | Stimulus::List { receiver, .. }
            | Stimulus::Message { receiver, .. } => format!("Sent {}: ", receiver),
            Stimulus::MidiNoteOn { .. } => "Sent MIDI Note: ".to_string(),
            Stimulus::MidiCc { .. } => "Sent MIDI CC: ".to_string(),
            Stimulus::MidiProgramChange { .. } => "Sent MIDI Program Change: ".to_string(),
            Stimulus::MidiPitchBend { .. } => "Sent MIDI Pitch Bend: ".to_string(),
            Stimulus::MidiAftertouch { .. } => "Sent MIDI Aftertouch: ".to_string(),
            Stimulus::MidiPolyAftertouch { .. } => "Sent MIDI Poly Aftertouch: ".to_string(),
            Stimulus::MidiByte { .. } => "Sent MIDI Byte: ".to_string(),
            Stimulus::MidiSysex { .. } => "Sent MIDI Sysex: ".to_string(),
            Stimulus::MidiRealtime { .. } => "Sent MIDI Realtime: ".to_string(),
            Stimulus::ArrayWrite { .. } => "Sent random array data: ".to_string(),
            Stimulus::ArraySineWrite { .. } => "Sent sine wave array data: ".to_string(),
            Stimulus::SpatialiseTrigger => "Triggered spatialisation: ".to_string(),
            Stimulus::DynamicToggle { .. } => "Dynamic instance: ".to_string(),
        }
    }

    /// Name used for array outcomes and logging
    pub fn label(&self) -> &'static str {
        match self {
            Stimulus::Bang { .. } => "Bang",
            Stimulus::Float { .. } => "Float",
            Stimulus::Symbol { .. } => "Symbol",
            Stimulus::List { .. } => "List",
            Stimulus::Message { .. } => "Message",
            Stimulus::MidiNoteOn { .. } => "MIDI Note",
            Stimulus::MidiCc { .. } => "MIDI CC",
            Stimulus::MidiProgramChange { .. } => "MIDI Program Change",
            Stimulus::MidiPitchBend { .. } => "MIDI Pitch Bend",
            Stimulus::MidiAftertouch { .. } => "MIDI Aftertouch",
            Stimulus::MidiPolyAftertouch { .. } => "MIDI Poly Aftertouch",
            Stimulus::MidiByte { .. } => "MIDI Byte",
            Stimulus::MidiSysex { .. } => "MIDI Sysex",
            Stimulus::MidiRealtime { .. } => "MIDI Realtime",
            Stimulus::ArrayWrite { .. } => "Random Array",
            Stimulus::ArraySineWrite { .. } => "Sine Array",
            Stimulus::SpatialiseTrigger => "Spatialisation",
            Stimulus::DynamicToggle { .. } => "Dynamic Instance",
        }
    }

    /// Whether the engine answers this stimulus on a receive route
    pub fn expects_echo(&self) -> bool {
        !matches!(
            self,
            Stimulus::ArrayWrite { .. }
                | Stimulus::ArraySineWrite { .. }
                | Stimulus::SpatialiseTrigger
                | Stimulus::DynamicToggle { .. }
        )
    }

    /// Issue the wire call for message and MIDI stimuli.
    ///
    /// Returns false for array, spatialisation and dynamic-instance stimuli,
    /// which the session routes to the round-trip check and the scene.
    pub fn send_to(&self, engine: &mut dyn EngineAdapter) -> bool {
        match self {
            Stimulus::Bang { receiver } => engine.send_bang(receiver),
            Stimulus::Float { receiver, value } => engine.send_float(receiver, *value),
            Stimulus::Symbol { receiver, symbol } => engine.send_symbol(receiver, symbol),
            Stimulus::List { receiver, atoms } => engine.send_list(receiver, atoms),
            Stimulus::Message {
                receiver,
                selector,
                atoms,
            } => engine.send_message(receiver, selector, atoms),
            Stimulus::MidiNoteOn {
                channel,
                pitch,
                velocity,
            } => engine.send_midi_note_on(*channel, *pitch, *velocity),
            Stimulus::MidiCc {
                channel,
                controller,
                value,
            } => engine.send_midi_cc(*channel, *controller, *value),
            Stimulus::MidiProgramChange { channel, program } => {
                engine.send_midi_program_change(*channel, *program)
            }
            Stimulus::MidiPitchBend { channel, value } => {
                engine.send_midi_pitch_bend(*channel, *value)
            }
            Stimulus::MidiAftertouch { channel, value } => {
                engine.send_midi_aftertouch(*channel, *value)
            }
            Stimulus::MidiPolyAftertouch {
                channel,
                pitch,
                value,
            } => engine.send_midi_poly_aftertouch(*channel, *pitch, *value),
            Stimulus::MidiByte { port, value } => engine.send_midi_byte(*port, *value),
            Stimulus::MidiSysex { port, value } => engine.send_midi_sysex(*port, *value),
            Stimulus::MidiRealtime { port, value } => engine.send_midi_realtime(*port, *value),
            Stimulus::ArrayWrite { .. }
            | Stimulus::ArraySineWrite { .. }
            | Stimulus::SpatialiseTrigger
            | Stimulus::DynamicToggle { .. } => return false,
        }
        true
    }
}

// =============================================================================
// CANONICAL TEXT (shared with echoes)
// =============================================================================

/// `0; 15.99; test;`
pub fn list_text(atoms: &[Atom]) -> String {
    atoms
        .iter()
        .map(|a| format!("{};", a))
        .collect::<Vec<_>>()
        .join(" ")
}

/// `test 1;`
pub fn message_text(selector: &str, atoms: &[Atom]) -> String {
    let mut text = selector.to_string();
    for atom in atoms {
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(&atom.to_string());
    }
    text.push(';');
    text
}

pub fn note_text(channel: i32, pitch: i32, velocity: i32) -> String {
    format!("channel = {}; note = {}; velocity = {}", channel, pitch, velocity)
}

pub fn cc_text(channel: i32, controller: i32, value: i32) -> String {
    format!("channel = {}; controller = {}; value = {}", channel, controller, value)
}

pub fn program_text(channel: i32, program: i32) -> String {
    format!("channel = {}; program = {}", channel, program)
}

pub fn channel_value_text(channel: i32, value: i32) -> String {
    format!("channel = {}; value = {}", channel, value)
}

pub fn poly_text(channel: i32, pitch: i32, value: i32) -> String {
    format!("channel = {}; note = {}; value = {}", channel, pitch, value)
}

pub fn port_value_text(port: i32, value: i32) -> String {
    format!("port = {}; value = {}", port, value)
}

pub fn samples_text(samples: &[f32]) -> String {
    samples
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_list_canonical_text() {
        assert_eq!(Stimulus::test_list().canonical_text(), "0; 15.99; test;");
        assert_eq!(Stimulus::test_list().preamble(), "Sent listIn: ");
    }

    #[test]
    fn test_message_canonical_text() {
        assert_eq!(Stimulus::test_message().canonical_text(), "test 1;");
        assert_eq!(message_text("", &[Atom::Float(2.0)]), "2;");
    }

    #[test]
    fn test_midi_canonical_text() {
        let note = Stimulus::MidiNoteOn {
            channel: 0,
            pitch: 60,
            velocity: 127,
        };
        assert_eq!(note.canonical_text(), "channel = 0; note = 60; velocity = 127");

        let bend = Stimulus::MidiPitchBend {
            channel: 0,
            value: 8191,
        };
        assert_eq!(bend.canonical_text(), "channel = 0; value = 8191");

        let realtime = Stimulus::MidiRealtime {
            port: 0,
            value: 250,
        };
        assert_eq!(realtime.canonical_text(), "port = 0; value = 250");
        assert_eq!(realtime.preamble(), "Sent MIDI Realtime: ");
    }

    #[test]
    fn test_scalar_canonical_text() {
        assert_eq!(Stimulus::bang().canonical_text(), "bang");
        assert_eq!(Stimulus::float(0.5).canonical_text(), "0.5");
        assert_eq!(
            Stimulus::symbol("Automated test string").canonical_text(),
            "Automated test string"
        );
    }

    #[test]
    fn test_random_array_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let Stimulus::ArrayWrite { samples, array, .. } = Stimulus::random_array(&mut rng) else {
            panic!("Wrong stimulus type");
        };
        assert_eq!(array, TEST_ARRAY_NAME);
        assert_eq!(samples.len(), TEST_ARRAY_LEN);
        assert!(samples.iter().all(|s| (-1.0..1.0).contains(s)));
    }

    #[test]
    fn test_sine_array_period() {
        let Stimulus::ArraySineWrite { samples, .. } = Stimulus::sine_array() else {
            panic!("Wrong stimulus type");
        };
        assert_eq!(samples.len(), TEST_ARRAY_LEN);
        assert_eq!(samples[0], 0.0);
        assert!(samples[9].abs() < 1e-5);
        assert!(samples[2] > 0.9);
        assert!(samples[7] < -0.9);
    }

    #[test]
    fn test_non_engine_stimuli_not_sent() {
        let mut engine = crate::engine::LoopbackEngine::new();
        assert!(!Stimulus::SpatialiseTrigger.send_to(&mut engine));
        assert!(!Stimulus::sine_array().send_to(&mut engine));
        assert!(Stimulus::bang().send_to(&mut engine));
        assert_eq!(engine.calls().len(), 1);

        assert!(!Stimulus::DynamicToggle { create: true }.expects_echo());
        assert!(Stimulus::test_message().expects_echo());
    }
}
