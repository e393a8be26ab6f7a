//! A table driven UTF-8 decoder (Björn Höhrmann's DFA).
//!
//! States are multiples of 12 so they index rows of the transition table directly.

pub const ACCEPT: u32 = 0;
pub const REJECT: u32 = 12;

/// Maps every byte value to its character class.
const CLASSES: [u8; 256] = {
    let mut classes = [0u8; 256];
    let mut byte = 0x80;
    while byte < 0x100 {
        classes[byte] = match byte {
            0x80..=0x8f => 1,
            0x90..=0x9f => 9,
            0xa0..=0xbf => 7,
            0xc0..=0xc1 => 8,
            0xc2..=0xdf => 2,
            0xe0 => 10,
            0xed => 4,
            0xe1..=0xef => 3,
            0xf0 => 11,
            0xf1..=0xf3 => 6,
            0xf4 => 5,
            _ => 8,
        };
        byte += 1;
    }
    classes
};

/// `TRANSITIONS[state + class]` is the next state.
#[rustfmt::skip]
const TRANSITIONS: [u8; 108] = [
     0, 12, 24, 36, 60, 96, 84, 12, 12, 12, 48, 72,
    12, 12, 12, 12, 12, 12, 12, 12, 12, 12, 12, 12,
    12,  0, 12, 12, 12, 12, 12,  0, 12,  0, 12, 12,
    12, 24, 12, 12, 12, 12, 12, 24, 12, 24, 12, 12,
    12, 12, 12, 12, 12, 12, 12, 24, 12, 12, 12, 12,
    12, 24, 12, 12, 12, 12, 12, 12, 12, 24, 12, 12,
    12, 12, 12, 12, 12, 12, 12, 36, 12, 36, 12, 12,
    12, 36, 12, 12, 12, 12, 12, 36, 12, 36, 12, 12,
    12, 36, 12, 12, 12, 12, 12, 12, 12, 12, 12, 12,
];

/// Advances the automaton by one byte and returns the new state.
///
/// `codepoint` accumulates the scalar value and is complete when the returned state is
/// [`ACCEPT`]. [`REJECT`] is absorbing; callers reset `state` to [`ACCEPT`] to continue.
pub fn decode(state: &mut u32, codepoint: &mut u32, byte: u8) -> u32 {
    let class = CLASSES[byte as usize] as u32;
    let byte = byte as u32;

    *codepoint = if *state != ACCEPT {
        (byte & 0x3f) | (*codepoint << 6)
    } else {
        (0xff >> class) & byte
    };

    *state = TRANSITIONS[(*state + class) as usize] as u32;
    *state
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    Char(u32),
    Incomplete,
    Invalid,
}

/// A resynchronizing decoder.
///
/// When a byte rejects the current sequence, the malformed prefix is dropped and the byte is
/// decoded again as the start of a new sequence.
#[derive(Debug, Default, Clone, Copy)]
pub struct Utf8Decoder {
    state: u32,
    codepoint: u32,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, byte: u8) -> Decoded {
        let in_sequence = self.state != ACCEPT;
        match decode(&mut self.state, &mut self.codepoint, byte) {
            ACCEPT => Decoded::Char(self.codepoint),
            REJECT => {
                self.state = ACCEPT;
                if in_sequence {
                    // Retry the byte that broke the sequence on its own.
                    match decode(&mut self.state, &mut self.codepoint, byte) {
                        ACCEPT => return Decoded::Char(self.codepoint),
                        REJECT => self.state = ACCEPT,
                        _ => return Decoded::Incomplete,
                    }
                }
                Decoded::Invalid
            }
            _ => Decoded::Incomplete,
        }
    }
}

/// Decodes all complete scalar values in `bytes`, skipping malformed sequences.
pub fn decode_all(bytes: &[u8]) -> impl Iterator<Item = u32> + '_ {
    let mut decoder = Utf8Decoder::new();
    bytes.iter().filter_map(move |byte| match decoder.push(*byte) {
        Decoded::Char(c) => Some(c),
        Decoded::Incomplete | Decoded::Invalid => None,
    })
}
