//! Android `KeyEvent` codes accepted by televisions on the command channel.
//!
//! The values are the standard Android constants; only the subset a remote
//! control actually sends is named here.

/// D-pad up
pub const DPAD_UP: u32 = 19;
/// D-pad down
pub const DPAD_DOWN: u32 = 20;
/// D-pad left
pub const DPAD_LEFT: u32 = 21;
/// D-pad right
pub const DPAD_RIGHT: u32 = 22;
/// D-pad center (select)
pub const DPAD_CENTER: u32 = 23;

/// Back
pub const BACK: u32 = 4;
/// Home
pub const HOME: u32 = 3;

/// Volume up
pub const VOLUME_UP: u32 = 24;
/// Volume down
pub const VOLUME_DOWN: u32 = 25;
/// Volume mute toggle
pub const VOLUME_MUTE: u32 = 164;

/// Power toggle
pub const POWER: u32 = 26;

/// Play/pause toggle
pub const MEDIA_PLAY_PAUSE: u32 = 85;
/// Stop
pub const MEDIA_STOP: u32 = 86;
/// Next track
pub const MEDIA_NEXT: u32 = 87;
/// Previous track
pub const MEDIA_PREVIOUS: u32 = 88;
/// Rewind
pub const MEDIA_REWIND: u32 = 89;
/// Fast-forward
pub const MEDIA_FAST_FORWARD: u32 = 90;

/// Channel up
pub const CHANNEL_UP: u32 = 166;
/// Channel down
pub const CHANNEL_DOWN: u32 = 167;
/// Program guide
pub const GUIDE: u32 = 172;

/// Digit 0
pub const DIGIT_0: u32 = 7;
/// Digit 1
pub const DIGIT_1: u32 = 8;
/// Digit 2
pub const DIGIT_2: u32 = 9;
/// Digit 3
pub const DIGIT_3: u32 = 10;
/// Digit 4
pub const DIGIT_4: u32 = 11;
/// Digit 5
pub const DIGIT_5: u32 = 12;
/// Digit 6
pub const DIGIT_6: u32 = 13;
/// Digit 7
pub const DIGIT_7: u32 = 14;
/// Digit 8
pub const DIGIT_8: u32 = 15;
/// Digit 9
pub const DIGIT_9: u32 = 16;

/// Delete (backspace)
pub const DEL: u32 = 67;
/// Enter
pub const ENTER: u32 = 66;

/// Map a decimal digit to its keycode.
#[must_use]
pub fn digit(n: u8) -> Option<u32> {
    (n <= 9).then(|| DIGIT_0 + u32::from(n))
}
