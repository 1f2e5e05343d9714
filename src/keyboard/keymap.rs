//! Computer keyboard to interval table.
//!
//! The home row plays the white keys and the row above it the black keys,
//! like a piano laid flat:
//!
//! ```text
//!   w e   t y u   o p
//!  a s d f g h j k l ; '
//! ```

use super::layout::Interval;

const HOME_ROW: [char; 18] = [
    'a', 'w', 's', 'e', 'd', 'f', 't', 'g', 'y', 'h', 'u', 'j', 'k', 'o', 'l', 'p', ';', '\'',
];

/// Number of intervals reachable from the keyboard.
pub const KEY_COUNT: usize = HOME_ROW.len();

/// Interval for a typed character, case-insensitive.
pub fn interval_for_key(key: char) -> Option<Interval> {
    let key = key.to_ascii_lowercase();
    HOME_ROW.iter().position(|&k| k == key)
}

/// The character that plays `interval`.
pub fn key_for_interval(interval: Interval) -> Option<char> {
    HOME_ROW.get(interval).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn home_row_maps_to_consecutive_intervals() {
        assert_eq!(interval_for_key('a'), Some(0));
        assert_eq!(interval_for_key('w'), Some(1));
        assert_eq!(interval_for_key('h'), Some(9));
        assert_eq!(interval_for_key('k'), Some(12));
        assert_eq!(interval_for_key('\''), Some(17));
    }

    #[test]
    fn uppercase_is_accepted() {
        assert_eq!(interval_for_key('A'), Some(0));
    }

    #[test]
    fn unmapped_keys_are_ignored() {
        assert_eq!(interval_for_key('q'), None);
        assert_eq!(interval_for_key('1'), None);
    }

    #[test]
    fn table_round_trips() {
        for interval in 0..KEY_COUNT {
            let key = key_for_interval(interval).unwrap();
            assert_eq!(interval_for_key(key), Some(interval));
        }
        assert_eq!(key_for_interval(KEY_COUNT), None);
    }
}
