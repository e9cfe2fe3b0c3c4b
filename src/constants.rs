//! Fixed values for the harness
//!
//! Channel names, catalog payloads and timing defaults shared by the
//! sequencer, the loopback engine and the tests.

use std::time::Duration;

// =============================================================================
// RECEIVE CHANNELS (engine -> harness)
// =============================================================================

pub const TRIGGER_OUT: &str = "triggerOut";
pub const FLOAT_OUT: &str = "floatOut";
pub const STRING_OUT: &str = "stringOut";
pub const LIST_OUT: &str = "listOut";
pub const MESSAGE_OUT: &str = "messageOut";

/// Every channel the session binds on start
pub const RECEIVE_CHANNELS: [&str; 5] = [TRIGGER_OUT, FLOAT_OUT, STRING_OUT, LIST_OUT, MESSAGE_OUT];

// =============================================================================
// SEND CHANNELS (harness -> engine)
// =============================================================================

pub const TRIGGER_IN: &str = "triggerIn";
pub const FLOAT_IN: &str = "floatIn";
pub const STRING_IN: &str = "stringIn";
pub const LIST_IN: &str = "listIn";
pub const MESSAGE_IN: &str = "messageIn";

/// Receivers on the spatialisation patch
pub const SPATIALISE_LEVEL: &str = "level";
pub const SPATIALISE_TOGGLE: &str = "toggle";

// =============================================================================
// CATALOG PAYLOADS
// =============================================================================

pub const AUTOMATED_FLOAT: f32 = 0.5;
pub const AUTOMATED_SYMBOL: &str = "Automated test string";

pub const MIDI_CHANNEL: i32 = 0;
pub const MIDI_PORT: i32 = 0;
pub const MIDI_NOTE: i32 = 60;
pub const MIDI_MAX_VALUE: i32 = 127;
pub const MIDI_BEND_CENTRE: i32 = 8191;
/// MIDI "start" realtime status byte
pub const MIDI_REALTIME_START: i32 = 250;

// =============================================================================
// ARRAY ROUND-TRIP
// =============================================================================

pub const TEST_ARRAY_NAME: &str = "TestArray";
pub const TEST_ARRAY_LEN: usize = 10;
pub const TEST_ARRAY_OFFSET: usize = 0;

/// Plot projection scale (x spacing per sample, y per unit amplitude)
pub const PLOT_X_SPACING: f32 = 40.0;
pub const PLOT_Y_SCALE: f32 = 100.0;

// =============================================================================
// CONSOLE / TIMING
// =============================================================================

pub const CONSOLE_CAPACITY: usize = 15;

/// Wait before the dynamic-deletion step so the created instance can run
pub const DYNAMIC_DELETE_DELAY: Duration = Duration::from_secs(1);

pub const DEFAULT_FRAME_RATE: f32 = 60.0;

/// Width of the label column in console result lines
pub const RESULT_LABEL_WIDTH: usize = 24;

// =============================================================================
// SPATIALISATION ORBIT
// =============================================================================

pub const ORBIT_STEP: f32 = 0.01;
pub const ORBIT_RADIUS: f32 = 10.0;
pub const ORBIT_CENTRE_Z: f32 = -10.0;

// =============================================================================
// FILES
// =============================================================================

pub const HARNESS_CONFIG_FILE: &str = "config/harness.json";
pub const RESULTS_FILE_PREFIX: &str = "TestResults";
