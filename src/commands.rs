//! Named harness actions and the table that turns them into stimuli
//!
//! Every triggering surface (command line, sequencer, any UI layer) sends a
//! [`HarnessCommand`]. Dispatch goes through [`CommandTable`], keyed by
//! [`CommandKind`], so nothing downstream cares where a command came from.

use bevy::prelude::*;
use rand::rngs::StdRng;
use std::collections::HashMap;

use crate::constants::*;
use crate::stimulus::Stimulus;

/// One discrete action
#[derive(Message, Debug, Clone, PartialEq)]
pub enum HarnessCommand {
    Bang,
    Float(f32),
    Symbol(String),
    List,
    Message,
    MidiNote,
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
    DynamicToggle,
    RunAutomatedTests,
}

/// Payload-free key of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Bang,
    Float,
    Symbol,
    List,
    Message,
    MidiNote,
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
    DynamicToggle,
    RunAutomatedTests,
}

impl CommandKind {
    pub const ALL: [CommandKind; 19] = [
        CommandKind::Bang,
        CommandKind::Float,
        CommandKind::Symbol,
        CommandKind::List,
        CommandKind::Message,
        CommandKind::MidiNote,
        CommandKind::MidiCc,
        CommandKind::MidiProgramChange,
        CommandKind::MidiPitchBend,
        CommandKind::MidiAftertouch,
        CommandKind::MidiPolyAftertouch,
        CommandKind::MidiByte,
        CommandKind::MidiSysex,
        CommandKind::MidiRealtime,
        CommandKind::ArrayRandom,
        CommandKind::ArraySine,
        CommandKind::Spatialise,
        CommandKind::DynamicToggle,
        CommandKind::RunAutomatedTests,
    ];

    /// Stable name used on the command line
    pub fn name(self) -> &'static str {
        match self {
            CommandKind::Bang => "bang",
            CommandKind::Float => "float",
            CommandKind::Symbol => "symbol",
            CommandKind::List => "list",
            CommandKind::Message => "message",
            CommandKind::MidiNote => "midi-note",
            CommandKind::MidiCc => "midi-cc",
            CommandKind::MidiProgramChange => "midi-program-change",
            CommandKind::MidiPitchBend => "midi-pitch-bend",
            CommandKind::MidiAftertouch => "midi-aftertouch",
            CommandKind::MidiPolyAftertouch => "midi-poly-aftertouch",
            CommandKind::MidiByte => "midi-byte",
            CommandKind::MidiSysex => "midi-sysex",
            CommandKind::MidiRealtime => "midi-realtime",
            CommandKind::ArrayRandom => "array-random",
            CommandKind::ArraySine => "array-sine",
            CommandKind::Spatialise => "spatialise",
            CommandKind::DynamicToggle => "dynamic-toggle",
            CommandKind::RunAutomatedTests => "run-tests",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.name() == name)
    }
}

impl HarnessCommand {
    pub fn kind(&self) -> CommandKind {
        match self {
            HarnessCommand::Bang => CommandKind::Bang,
            HarnessCommand::Float(_) => CommandKind::Float,
            HarnessCommand::Symbol(_) => CommandKind::Symbol,
            HarnessCommand::List => CommandKind::List,
            HarnessCommand::Message => CommandKind::Message,
            HarnessCommand::MidiNote => CommandKind::MidiNote,
            HarnessCommand::MidiCc => CommandKind::MidiCc,
            HarnessCommand::MidiProgramChange => CommandKind::MidiProgramChange,
            HarnessCommand::MidiPitchBend => CommandKind::MidiPitchBend,
            HarnessCommand::MidiAftertouch => CommandKind::MidiAftertouch,
            HarnessCommand::MidiPolyAftertouch => CommandKind::MidiPolyAftertouch,
            HarnessCommand::MidiByte => CommandKind::MidiByte,
            HarnessCommand::MidiSysex => CommandKind::MidiSysex,
            HarnessCommand::MidiRealtime => CommandKind::MidiRealtime,
            HarnessCommand::ArrayRandom => CommandKind::ArrayRandom,
            HarnessCommand::ArraySine => CommandKind::ArraySine,
            HarnessCommand::Spatialise => CommandKind::Spatialise,
            HarnessCommand::DynamicToggle => CommandKind::DynamicToggle,
            HarnessCommand::RunAutomatedTests => CommandKind::RunAutomatedTests,
        }
    }

    /// Parse `name` or `name:value` (value only for `float` and `symbol`)
    pub fn parse(input: &str) -> Result<Self, String> {
        let (name, value) = match input.split_once(':') {
            Some((name, value)) => (name, Some(value)),
            None => (input, None),
        };
        let kind = CommandKind::from_name(name).ok_or_else(|| {
            let names: Vec<_> = CommandKind::ALL.iter().map(|k| k.name()).collect();
            format!("Unknown command '{}'. Available: {}", name, names.join(", "))
        })?;

        let command = match (kind, value) {
            (CommandKind::Float, Some(v)) => HarnessCommand::Float(
                v.parse()
                    .map_err(|e| format!("Invalid float '{}': {}", v, e))?,
            ),
            (CommandKind::Float, None) => HarnessCommand::Float(AUTOMATED_FLOAT),
            (CommandKind::Symbol, Some(v)) => HarnessCommand::Symbol(v.to_string()),
            (CommandKind::Symbol, None) => HarnessCommand::Symbol(AUTOMATED_SYMBOL.to_string()),
            (_, Some(_)) => return Err(format!("Command '{}' takes no value", name)),
            (kind, None) => Self::unit(kind),
        };
        Ok(command)
    }

    fn unit(kind: CommandKind) -> Self {
        match kind {
            CommandKind::Bang => HarnessCommand::Bang,
            CommandKind::Float => HarnessCommand::Float(AUTOMATED_FLOAT),
            CommandKind::Symbol => HarnessCommand::Symbol(AUTOMATED_SYMBOL.to_string()),
            CommandKind::List => HarnessCommand::List,
            CommandKind::Message => HarnessCommand::Message,
            CommandKind::MidiNote => HarnessCommand::MidiNote,
            CommandKind::MidiCc => HarnessCommand::MidiCc,
            CommandKind::MidiProgramChange => HarnessCommand::MidiProgramChange,
            CommandKind::MidiPitchBend => HarnessCommand::MidiPitchBend,
            CommandKind::MidiAftertouch => HarnessCommand::MidiAftertouch,
            CommandKind::MidiPolyAftertouch => HarnessCommand::MidiPolyAftertouch,
            CommandKind::MidiByte => HarnessCommand::MidiByte,
            CommandKind::MidiSysex => HarnessCommand::MidiSysex,
            CommandKind::MidiRealtime => HarnessCommand::MidiRealtime,
            CommandKind::ArrayRandom => HarnessCommand::ArrayRandom,
            CommandKind::ArraySine => HarnessCommand::ArraySine,
            CommandKind::Spatialise => HarnessCommand::Spatialise,
            CommandKind::DynamicToggle => HarnessCommand::DynamicToggle,
            CommandKind::RunAutomatedTests => HarnessCommand::RunAutomatedTests,
        }
    }
}

/// What a handler decided the session should do
#[derive(Debug, Clone, PartialEq)]
pub enum CommandAction {
    Issue(Stimulus),
    StartAutomatedRun,
}

/// State handlers may read while building a stimulus
pub struct HandlerContext<'a> {
    pub rng: &'a mut StdRng,
    pub dynamic_instance_alive: bool,
}

pub type CommandHandler = fn(&HarnessCommand, &mut HandlerContext<'_>) -> CommandAction;

/// Dispatch table from command kind to handler
#[derive(Resource)]
pub struct CommandTable {
    handlers: HashMap<CommandKind, CommandHandler>,
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl CommandTable {
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Table with a handler for every command kind
    pub fn standard() -> Self {
        let mut table = Self::empty();
        table.register(CommandKind::Bang, |_, _| CommandAction::Issue(Stimulus::bang()));
        table.register(CommandKind::Float, |cmd, _| {
            let value = match cmd {
                HarnessCommand::Float(v) => *v,
                _ => AUTOMATED_FLOAT,
            };
            CommandAction::Issue(Stimulus::float(value))
        });
        table.register(CommandKind::Symbol, |cmd, _| {
            let symbol = match cmd {
                HarnessCommand::Symbol(s) => s.clone(),
                _ => AUTOMATED_SYMBOL.to_string(),
            };
            CommandAction::Issue(Stimulus::symbol(symbol))
        });
        table.register(CommandKind::List, |_, _| {
            CommandAction::Issue(Stimulus::test_list())
        });
        table.register(CommandKind::Message, |_, _| {
            CommandAction::Issue(Stimulus::test_message())
        });
        table.register(CommandKind::MidiNote, |_, _| {
            CommandAction::Issue(Stimulus::MidiNoteOn {
                channel: MIDI_CHANNEL,
                pitch: MIDI_NOTE,
                velocity: MIDI_MAX_VALUE,
            })
        });
        table.register(CommandKind::MidiCc, |_, _| {
            CommandAction::Issue(Stimulus::MidiCc {
                channel: MIDI_CHANNEL,
                controller: 0,
                value: MIDI_MAX_VALUE,
            })
        });
        table.register(CommandKind::MidiProgramChange, |_, _| {
            CommandAction::Issue(Stimulus::MidiProgramChange {
                channel: MIDI_CHANNEL,
                program: 0,
            })
        });
        table.register(CommandKind::MidiPitchBend, |_, _| {
            CommandAction::Issue(Stimulus::MidiPitchBend {
                channel: MIDI_CHANNEL,
                value: MIDI_BEND_CENTRE,
            })
        });
        table.register(CommandKind::MidiAftertouch, |_, _| {
            CommandAction::Issue(Stimulus::MidiAftertouch {
                channel: MIDI_CHANNEL,
                value: MIDI_MAX_VALUE,
            })
        });
        table.register(CommandKind::MidiPolyAftertouch, |_, _| {
            CommandAction::Issue(Stimulus::MidiPolyAftertouch {
                channel: MIDI_CHANNEL,
                pitch: MIDI_NOTE,
                value: MIDI_MAX_VALUE,
            })
        });
        table.register(CommandKind::MidiByte, |_, _| {
            CommandAction::Issue(Stimulus::MidiByte {
                port: MIDI_PORT,
                value: MIDI_MAX_VALUE,
            })
        });
        table.register(CommandKind::MidiSysex, |_, _| {
            CommandAction::Issue(Stimulus::MidiSysex {
                port: MIDI_PORT,
                value: MIDI_MAX_VALUE,
            })
        });
        table.register(CommandKind::MidiRealtime, |_, _| {
            CommandAction::Issue(Stimulus::MidiRealtime {
                port: MIDI_PORT,
                value: MIDI_REALTIME_START,
            })
        });
        table.register(CommandKind::ArrayRandom, |_, ctx| {
            CommandAction::Issue(Stimulus::random_array(&mut *ctx.rng))
        });
        table.register(CommandKind::ArraySine, |_, _| {
            CommandAction::Issue(Stimulus::sine_array())
        });
        table.register(CommandKind::Spatialise, |_, _| {
            CommandAction::Issue(Stimulus::SpatialiseTrigger)
        });
        table.register(CommandKind::DynamicToggle, |_, ctx| {
            CommandAction::Issue(Stimulus::DynamicToggle {
                create: !ctx.dynamic_instance_alive,
            })
        });
        table.register(CommandKind::RunAutomatedTests, |_, _| {
            CommandAction::StartAutomatedRun
        });
        table
    }

    /// Install or replace the handler for `kind`
    pub fn register(&mut self, kind: CommandKind, handler: CommandHandler) {
        self.handlers.insert(kind, handler);
    }

    /// Run the handler for `command`, None if no handler is registered
    pub fn dispatch(
        &self,
        command: &HarnessCommand,
        ctx: &mut HandlerContext<'_>,
    ) -> Option<CommandAction> {
        let handler = self.handlers.get(&command.kind())?;
        Some(handler(command, ctx))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
