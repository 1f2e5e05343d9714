//! Interval to pitch mapping and the set of depressed keys.

use std::collections::BTreeSet;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::pitch::{ChromaticScale, Pitch, CHROMATIC};

/// Index of one key position in the layout, independent of input device.
pub type Interval = usize;

/// Map an interval to a pitch.
///
/// `octave = base_octave + interval / 12`, `name = scale[interval % 12]`.
/// Octaves above `i8::MAX` saturate there; [`try_pitch_for_interval`] reports
/// them instead.
pub fn pitch_for_interval(interval: Interval, base_octave: i8, scale: &ChromaticScale) -> Pitch {
    try_pitch_for_interval(interval, base_octave, scale)
        .unwrap_or_else(|| Pitch::new(scale[interval % scale.len()], i8::MAX))
}

/// [`pitch_for_interval`], or `None` when the octave does not fit in an `i8`.
pub fn try_pitch_for_interval(
    interval: Interval,
    base_octave: i8,
    scale: &ChromaticScale,
) -> Option<Pitch> {
    let octave_offset = i64::try_from(interval / scale.len()).ok()?;
    let octave = i8::try_from(i64::from(base_octave) + octave_offset).ok()?;
    Some(Pitch::new(scale[interval % scale.len()], octave))
}

/// Errors raised at the mapper boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// Interval is not a key of this layout
    OutOfRange { interval: Interval, size: usize },
    /// Interval lands above the highest representable octave
    OctaveOverflow { interval: Interval, base_octave: i8 },
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutError::OutOfRange { interval, size } => {
                write!(
                    f,
                    "interval {} is outside the layout (0..{})",
                    interval, size
                )
            }
            LayoutError::OctaveOverflow {
                interval,
                base_octave,
            } => {
                write!(
                    f,
                    "interval {} above octave {} has no representable octave",
                    interval, base_octave
                )
            }
        }
    }
}

impl std::error::Error for LayoutError {}

/// A fixed row of keys starting at `base_octave`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLayout {
    pub base_octave: i8,
    pub scale: ChromaticScale,
    pub size: usize,
}

impl KeyLayout {
    pub fn new(base_octave: i8, size: usize) -> Self {
        Self {
            base_octave,
            scale: CHROMATIC,
            size,
        }
    }

    /// Set the base octave
    pub fn base_octave(mut self, base_octave: i8) -> Self {
        self.base_octave = base_octave;
        self
    }

    /// Set the number of keys
    pub fn size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn contains(&self, interval: Interval) -> bool {
        interval < self.size
    }

    pub fn pitch(&self, interval: Interval) -> Result<Pitch, LayoutError> {
        if !self.contains(interval) {
            return Err(LayoutError::OutOfRange {
                interval,
                size: self.size,
            });
        }
        try_pitch_for_interval(interval, self.base_octave, &self.scale).ok_or(
            LayoutError::OctaveOverflow {
                interval,
                base_octave: self.base_octave,
            },
        )
    }

    /// Pitches for every interval in `active`, recomputed from scratch.
    pub fn desired_notes(&self, active: &ActiveSet) -> BTreeSet<Pitch> {
        active
            .iter()
            .filter_map(|interval| self.pitch(interval).ok())
            .collect()
    }

    /// All pitches of the layout, lowest first. Stops at the last key with a
    /// representable octave.
    pub fn pitches(&self) -> impl Iterator<Item = Pitch> + '_ {
        (0..self.size).map_while(|i| try_pitch_for_interval(i, self.base_octave, &self.scale))
    }
}

impl Default for KeyLayout {
    /// C4 up to F5, one key per home-row key.
    fn default() -> Self {
        Self::new(4, 18)
    }
}

/// Receives per-key highlight state from the input layer.
pub trait HighlightSink {
    fn set_highlight(&mut self, interval: Interval, enabled: bool);
}

/// The set of intervals currently held down.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveSet {
    intervals: BTreeSet<Interval>,
}

impl ActiveSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an interval as held. Returns `Ok(true)` if the set changed.
    pub fn press(&mut self, interval: Interval, layout: &KeyLayout) -> Result<bool, LayoutError> {
        layout.pitch(interval)?;
        Ok(self.intervals.insert(interval))
    }

    /// Returns true if the interval was held.
    pub fn release(&mut self, interval: Interval) -> bool {
        self.intervals.remove(&interval)
    }

    /// Returns true if anything was held.
    pub fn clear(&mut self) -> bool {
        let changed = !self.intervals.is_empty();
        self.intervals.clear();
        changed
    }

    pub fn contains(&self, interval: Interval) -> bool {
        self.intervals.contains(&interval)
    }

    pub fn iter(&self) -> impl Iterator<Item = Interval> + '_ {
        self.intervals.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Push the enabled flag of every key in the layout to `sink`.
    pub fn sync_highlights(&self, layout: &KeyLayout, sink: &mut impl HighlightSink) {
        for interval in 0..layout.size {
            sink.set_highlight(interval, self.contains(interval));
        }
    }
}
