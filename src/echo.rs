//! Echoes received from the engine
//!
//! An [`Echo`] is an [`EngineEvent`] reduced to the same canonical text as the
//! stimulus that caused it. [`EchoRoutes`] is the session-owned observer list
//! deciding which kinds of event reach the verifier at all.

use std::collections::HashSet;

use crate::constants::*;
use crate::engine::EngineEvent;
use crate::stimulus::{
    cc_text, channel_value_text, list_text, message_text, note_text, poly_text, port_value_text,
    program_text,
};

/// Receive route an event can arrive on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EchoRoute {
    Bang,
    Float,
    Symbol,
    List,
    Message,
    MidiNoteOn,
    MidiCc,
    MidiProgramChange,
    MidiPitchBend,
    MidiAftertouch,
    MidiPolyAftertouch,
    MidiByte,
}

impl EchoRoute {
    /// Routes the harness listens on by default
    pub const DEFAULT: [EchoRoute; 8] = [
        EchoRoute::Message,
        EchoRoute::MidiNoteOn,
        EchoRoute::MidiCc,
        EchoRoute::MidiProgramChange,
        EchoRoute::MidiPitchBend,
        EchoRoute::MidiAftertouch,
        EchoRoute::MidiPolyAftertouch,
        EchoRoute::MidiByte,
    ];

    /// Bang/float/symbol/list routes; off unless explicitly enabled
    pub const SCALAR: [EchoRoute; 4] = [
        EchoRoute::Bang,
        EchoRoute::Float,
        EchoRoute::Symbol,
        EchoRoute::List,
    ];

    pub fn of(event: &EngineEvent) -> Self {
        match event {
            EngineEvent::Bang { .. } => EchoRoute::Bang,
            EngineEvent::Float { .. } => EchoRoute::Float,
            EngineEvent::Symbol { .. } => EchoRoute::Symbol,
            EngineEvent::List { .. } => EchoRoute::List,
            EngineEvent::Message { .. } => EchoRoute::Message,
            EngineEvent::MidiNoteOn { .. } => EchoRoute::MidiNoteOn,
            EngineEvent::MidiCc { .. } => EchoRoute::MidiCc,
            EngineEvent::MidiProgramChange { .. } => EchoRoute::MidiProgramChange,
            EngineEvent::MidiPitchBend { .. } => EchoRoute::MidiPitchBend,
            EngineEvent::MidiAftertouch { .. } => EchoRoute::MidiAftertouch,
            EngineEvent::MidiPolyAftertouch { .. } => EchoRoute::MidiPolyAftertouch,
            EngineEvent::MidiByte { .. } => EchoRoute::MidiByte,
        }
    }

    /// Output channel a named route listens to (None for MIDI)
    pub fn channel(self) -> Option<&'static str> {
        match self {
            EchoRoute::Bang => Some(TRIGGER_OUT),
            EchoRoute::Float => Some(FLOAT_OUT),
            EchoRoute::Symbol => Some(STRING_OUT),
            EchoRoute::List => Some(LIST_OUT),
            EchoRoute::Message => Some(MESSAGE_OUT),
            _ => None,
        }
    }
}

/// Observer list owned by the session: registered on start, cleared on teardown
#[derive(Debug, Default)]
pub struct EchoRoutes {
    routes: HashSet<EchoRoute>,
}

impl EchoRoutes {
    pub fn register(&mut self, route: EchoRoute) {
        self.routes.insert(route);
    }

    pub fn register_all(&mut self, routes: impl IntoIterator<Item = EchoRoute>) {
        self.routes.extend(routes);
    }

    pub fn clear(&mut self) {
        self.routes.clear();
    }

    pub fn is_registered(&self, route: EchoRoute) -> bool {
        self.routes.contains(&route)
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Reduce an event to an echo if something is listening for it
    pub fn accept(&self, event: &EngineEvent) -> Option<Echo> {
        let route = EchoRoute::of(event);
        if !self.is_registered(route) {
            return None;
        }
        let echo = Echo::from_event(event);
        // Named routes only accept their own output channel
        match route.channel() {
            Some(channel) if echo.source != channel => None,
            _ => Some(echo),
        }
    }
}

/// An engine response reduced to canonical text
#[derive(Debug, Clone, PartialEq)]
pub struct Echo {
    pub route: EchoRoute,
    /// Output channel name, or the MIDI kind for MIDI events
    pub source: String,
    pub text: String,
}

impl Echo {
    pub fn from_event(event: &EngineEvent) -> Self {
        let route = EchoRoute::of(event);
        let (source, text) = match event {
            EngineEvent::Bang { source } => (source.clone(), "bang".to_string()),
            EngineEvent::Float { source, value } => (source.clone(), value.to_string()),
            EngineEvent::Symbol { source, symbol } => (source.clone(), symbol.clone()),
            EngineEvent::List { source, atoms } => (source.clone(), list_text(atoms)),
            EngineEvent::Message {
                source,
                selector,
                atoms,
            } => (source.clone(), message_text(selector, atoms)),
            EngineEvent::MidiNoteOn {
                channel,
                pitch,
                velocity,
            } => ("MIDI Note".to_string(), note_text(*channel, *pitch, *velocity)),
            EngineEvent::MidiCc {
                channel,
                controller,
                value,
            } => ("MIDI CC".to_string(), cc_text(*channel, *controller, *value)),
            EngineEvent::MidiProgramChange { channel, program } => (
                "MIDI Program Change".to_string(),
                program_text(*channel, *program),
            ),
            EngineEvent::MidiPitchBend { channel, value } => (
                "MIDI Pitch Bend".to_string(),
                channel_value_text(*channel, *value),
            ),
            EngineEvent::MidiAftertouch { channel, value } => (
                "MIDI Aftertouch".to_string(),
                channel_value_text(*channel, *value),
            ),
            EngineEvent::MidiPolyAftertouch {
                channel,
                pitch,
                value,
            } => (
                "MIDI Poly Aftertouch".to_string(),
                poly_text(*channel, *pitch, *value),
            ),
            EngineEvent::MidiByte { port, value } => {
                ("MIDI Byte".to_string(), port_value_text(*port, *value))
            }
        };
        Self {
            route,
            source,
            text,
        }
    }

    /// `messageOut: ` / `MIDI Note: `
    pub fn preamble(&self) -> String {
        format!("{}: ", self.source)
    }

    /// Label the verifier reports this echo under
    pub fn label(&self) -> &'static str {
        match self.route {
            EchoRoute::Bang => "Bang",
            EchoRoute::Float => "Float",
            EchoRoute::Symbol => "Symbol",
            EchoRoute::List => "List",
            EchoRoute::Message => "Message",
            EchoRoute::MidiNoteOn => "MIDI Note",
            EchoRoute::MidiCc => "MIDI CC",
            EchoRoute::MidiProgramChange => "MIDI Program Change",
            EchoRoute::MidiPitchBend => "MIDI Pitch Bend",
            EchoRoute::MidiAftertouch => "MIDI Aftertouch",
            EchoRoute::MidiPolyAftertouch => "MIDI Poly Aftertouch",
            EchoRoute::MidiByte => "MIDI Byte",
        }
    }
}
