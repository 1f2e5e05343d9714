/*
Pitch Naming
============

A pitch is a note name plus an octave, in scientific pitch notation. Middle C
is C4, and A4 is the 440 Hz tuning reference.

Internally every pitch also has a semitone number using the MIDI convention:

    semitone_number = 12 * (octave + 1) + semitone

Where semitone: C=0, C#=1, D=2, D#=3, E=4, F=5, F#=6, G=7, G#=8, A=9, A#=10, B=11

So C4 = 60 and A4 = 69. Ordering pitches by this number orders them by
height, which is what the voice map and the UI want.

Naming Convention:
- Natural notes: C, D, E, etc.
- Sharps: Cs (C#), Ds (D#), etc. Display renders them as "C#".
- No flats: the chromatic scale is spelled with sharps only.
*/

use std::cmp::Ordering;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One of the twelve chromatic semitone names.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoteName {
    C,
    Cs,
    D,
    Ds,
    E,
    F,
    Fs,
    G,
    Gs,
    A,
    As,
    B,
}

/// A twelve-entry spelling of the octave, indexed by `interval mod 12`.
pub type ChromaticScale = [NoteName; 12];

/// The chromatic scale starting on C.
pub const CHROMATIC: ChromaticScale = [
    NoteName::C,
    NoteName::Cs,
    NoteName::D,
    NoteName::Ds,
    NoteName::E,
    NoteName::F,
    NoteName::Fs,
    NoteName::G,
    NoteName::Gs,
    NoteName::A,
    NoteName::As,
    NoteName::B,
];

impl NoteName {
    /// Semitones above C.
    pub fn semitone(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NoteName::C => "C",
            NoteName::Cs => "C#",
            NoteName::D => "D",
            NoteName::Ds => "D#",
            NoteName::E => "E",
            NoteName::F => "F",
            NoteName::Fs => "F#",
            NoteName::G => "G",
            NoteName::Gs => "G#",
            NoteName::A => "A",
            NoteName::As => "A#",
            NoteName::B => "B",
        }
    }

    /// True for the black keys of a piano keyboard.
    pub fn is_sharp(self) -> bool {
        matches!(
            self,
            NoteName::Cs | NoteName::Ds | NoteName::Fs | NoteName::Gs | NoteName::As
        )
    }
}

impl fmt::Display for NoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A note name in a specific octave. The unit of identity for a voice.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pitch {
    pub name: NoteName,
    pub octave: i8,
}

impl Pitch {
    pub const fn new(name: NoteName, octave: i8) -> Self {
        Self { name, octave }
    }

    /// Semitone number, C4 = 60, A4 = 69.
    pub fn semitone_number(&self) -> i32 {
        12 * (self.octave as i32 + 1) + self.name.semitone() as i32
    }
}

impl Ord for Pitch {
    fn cmp(&self, other: &Self) -> Ordering {
        self.semitone_number().cmp(&other.semitone_number())
    }
}

impl PartialOrd for Pitch {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.octave)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn middle_c_is_60() {
        assert_eq!(Pitch::new(NoteName::C, 4).semitone_number(), 60);
    }

    #[test]
    fn a440_is_69() {
        assert_eq!(Pitch::new(NoteName::A, 4).semitone_number(), 69);
    }

    #[test]
    fn octaves_are_12_apart() {
        let c4 = Pitch::new(NoteName::C, 4).semitone_number();
        let c5 = Pitch::new(NoteName::C, 5).semitone_number();
        assert_eq!(c5 - c4, 12);
    }

    #[test]
    fn ordering_follows_height_not_name() {
        let b3 = Pitch::new(NoteName::B, 3);
        let c4 = Pitch::new(NoteName::C, 4);
        let cs4 = Pitch::new(NoteName::Cs, 4);
        assert!(b3 < c4);
        assert!(c4 < cs4);
    }

    #[test]
    fn sharps_display_with_hash() {
        assert_eq!(Pitch::new(NoteName::Fs, 5).to_string(), "F#5");
        assert_eq!(Pitch::new(NoteName::A, 4).to_string(), "A4");
    }

    #[test]
    fn chromatic_scale_is_in_semitone_order() {
        for (i, name) in CHROMATIC.iter().enumerate() {
            assert_eq!(name.semitone() as usize, i);
        }
    }
}
