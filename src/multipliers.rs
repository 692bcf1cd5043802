//! Multiplier slot tables
//!
//! One table per difficulty, one row per supported row count. Rows are stored
//! as fixed arrays indexed by `rows - TABLE_MIN_ROWS`; every row has `rows + 1`
//! slots and is symmetric about the center.

use serde::{Deserialize, Serialize};

use crate::consts::{TABLE_MAX_ROWS, TABLE_MIN_ROWS};
use crate::settings::Difficulty;

/// A landing slot: payout multiplier plus its display color (0xRRGGBB)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MultiplierSlot {
    pub value: f64,
    pub color: u32,
}

const TABLE_ROWS: usize = (TABLE_MAX_ROWS - TABLE_MIN_ROWS + 1) as usize;

type ValueTable = [&'static [f64]; TABLE_ROWS];
type ColorTable = [&'static [u32]; TABLE_ROWS];

const MEDIUM_VALUES: ValueTable = [
    &[13.0, 3.0, 1.3, 0.7, 0.4, 0.7, 1.3, 3.0, 13.0],
    &[18.0, 4.0, 1.7, 0.9, 0.5, 0.5, 0.9, 1.7, 4.0, 18.0],
    &[22.0, 5.0, 2.0, 1.4, 0.6, 0.4, 0.6, 1.4, 2.0, 5.0, 22.0],
    &[24.0, 6.0, 3.0, 1.8, 0.7, 0.5, 0.5, 0.7, 1.8, 3.0, 6.0, 24.0],
    &[33.0, 11.0, 4.0, 2.0, 1.1, 0.6, 0.3, 0.6, 1.1, 2.0, 4.0, 11.0, 33.0],
    &[43.0, 13.0, 6.0, 3.0, 1.3, 0.7, 0.4, 0.4, 0.7, 1.3, 3.0, 6.0, 13.0, 43.0],
    &[58.0, 15.0, 7.0, 4.0, 1.9, 1.0, 0.5, 0.2, 0.5, 1.0, 1.9, 4.0, 7.0, 15.0, 58.0],
    &[
        88.0, 18.0, 11.0, 5.0, 3.0, 1.0, 0.5, 0.3, 0.3, 0.5, 1.0, 3.0, 5.0, 11.0, 18.0, 88.0,
    ],
    &[
        110.0, 41.0, 10.0, 5.0, 3.0, 1.5, 1.0, 0.5, 0.3, 0.5, 1.0, 1.5, 3.0, 5.0, 10.0, 41.0,
        110.0,
    ],
];

const LOW_VALUES: ValueTable = [
    &[5.6, 2.1, 1.1, 1.0, 0.5, 1.0, 1.1, 2.1, 5.6],
    &[5.6, 2.0, 1.6, 1.0, 0.7, 0.7, 1.0, 1.6, 2.0, 5.6],
    &[8.9, 3.0, 1.4, 1.1, 1.0, 0.5, 1.0, 1.1, 1.4, 3.0, 8.9],
    &[8.4, 3.0, 1.9, 1.3, 1.0, 0.7, 0.7, 1.0, 1.3, 1.9, 3.0, 8.4],
    &[10.0, 3.0, 1.6, 1.4, 1.1, 1.0, 0.5, 1.0, 1.1, 1.4, 1.6, 3.0, 10.0],
    &[8.1, 4.0, 3.0, 1.9, 1.2, 0.9, 0.7, 0.7, 0.9, 1.2, 1.9, 3.0, 4.0, 8.1],
    &[7.1, 4.0, 1.9, 1.4, 1.3, 1.1, 1.0, 0.5, 1.0, 1.1, 1.3, 1.4, 1.9, 4.0, 7.1],
    &[15.0, 8.0, 3.0, 2.0, 1.5, 1.1, 1.0, 0.7, 0.7, 1.0, 1.1, 1.5, 2.0, 3.0, 8.0, 15.0],
    &[
        16.0, 9.0, 2.0, 1.4, 1.4, 1.2, 1.1, 1.0, 0.5, 1.0, 1.1, 1.2, 1.4, 1.4, 2.0, 9.0, 16.0,
    ],
];

const HIGH_VALUES: ValueTable = [
    &[29.0, 4.0, 1.5, 0.3, 0.2, 0.3, 1.5, 4.0, 29.0],
    &[43.0, 7.0, 2.0, 0.6, 0.2, 0.2, 0.6, 2.0, 7.0, 43.0],
    &[76.0, 10.0, 3.0, 0.9, 0.3, 0.2, 0.3, 0.9, 3.0, 10.0, 76.0],
    &[120.0, 14.0, 5.2, 1.4, 0.4, 0.2, 0.2, 0.4, 1.4, 5.2, 14.0, 120.0],
    &[170.0, 24.0, 8.1, 2.0, 0.7, 0.3, 0.2, 0.3, 0.7, 2.0, 8.1, 24.0, 170.0],
    &[260.0, 37.0, 11.0, 4.0, 1.0, 0.2, 0.2, 0.2, 0.2, 1.0, 4.0, 11.0, 37.0, 260.0],
    &[420.0, 56.0, 18.0, 5.0, 1.9, 0.3, 0.2, 0.2, 0.2, 0.3, 1.9, 5.0, 18.0, 56.0, 420.0],
    &[
        620.0, 83.0, 27.0, 8.0, 3.0, 0.5, 0.2, 0.2, 0.2, 0.2, 0.5, 3.0, 8.0, 27.0, 83.0, 620.0,
    ],
    &[
        1000.0, 130.0, 26.0, 9.0, 4.0, 2.0, 0.2, 0.2, 0.2, 0.2, 0.2, 2.0, 4.0, 9.0, 26.0, 130.0,
        1000.0,
    ],
];

// Red at the edges fading to yellow at the center; low/high reuse these by slot.
const SLOT_COLORS: ColorTable = [
    &[
        0xff003f, 0xff302f, 0xff6020, 0xff9010, 0xffc000, 0xff9010, 0xff6020, 0xff302f, 0xff003f,
    ],
    &[
        0xff003f, 0xff2b31, 0xff5523, 0xff8015, 0xffab07, 0xffab07, 0xff8015, 0xff5523, 0xff2b31,
        0xff003f,
    ],
    &[
        0xff003f, 0xff2632, 0xff4d26, 0xff7319, 0xff9a0d, 0xffc000, 0xff9a0d, 0xff7319, 0xff4d26,
        0xff2632, 0xff003f,
    ],
    &[
        0xff003f, 0xff2334, 0xff4628, 0xff691d, 0xff8c11, 0xffaf06, 0xffaf06, 0xff8c11, 0xff691d,
        0xff4628, 0xff2334, 0xff003f,
    ],
    &[
        0xff003f, 0xff2035, 0xff402a, 0xff6020, 0xff8015, 0xffa00b, 0xffc000, 0xffa00b, 0xff8015,
        0xff6020, 0xff402a, 0xff2035, 0xff003f,
    ],
    &[
        0xff003f, 0xff1e35, 0xff3b2c, 0xff5922, 0xff7618, 0xff940f, 0xffb105, 0xffb105, 0xff940f,
        0xff7618, 0xff5922, 0xff3b2c, 0xff1e35, 0xff003f,
    ],
    &[
        0xff003f, 0xff1b36, 0xff372d, 0xff5224, 0xff6e1b, 0xff8912, 0xffa509, 0xffc000, 0xffa509,
        0xff8912, 0xff6e1b, 0xff5224, 0xff372d, 0xff1b36, 0xff003f,
    ],
    &[
        0xff003f, 0xff1a37, 0xff332e, 0xff4d26, 0xff661d, 0xff8015, 0xff9a0d, 0xffb304, 0xffb304,
        0xff9a0d, 0xff8015, 0xff661d, 0xff4d26, 0xff332e, 0xff1a37, 0xff003f,
    ],
    &[
        0xff003f, 0xff1837, 0xff302f, 0xff4827, 0xff6020, 0xff7818, 0xff9010, 0xffa808, 0xffc000,
        0xffa808, 0xff9010, 0xff7818, 0xff6020, 0xff4827, 0xff302f, 0xff1837, 0xff003f,
    ],
];

/// Fallback color when a slot has no color entry
const DEFAULT_COLOR: u32 = 0xffffff;

fn values_for(difficulty: Difficulty) -> &'static ValueTable {
    match difficulty {
        Difficulty::Low => &LOW_VALUES,
        Difficulty::Medium => &MEDIUM_VALUES,
        Difficulty::High => &HIGH_VALUES,
    }
}

/// Slots for a board, or an empty list when no table covers `rows`.
///
/// An empty list is the recoverable "no board" state: zero boxes, no rounds.
pub fn multipliers_for_rows(rows: u32, difficulty: Difficulty) -> Vec<MultiplierSlot> {
    if !(TABLE_MIN_ROWS..=TABLE_MAX_ROWS).contains(&rows) {
        log::warn!("No multiplier data available for {rows} rows.");
        return Vec::new();
    }
    let index = (rows - TABLE_MIN_ROWS) as usize;
    let colors = SLOT_COLORS[index];
    values_for(difficulty)[index]
        .iter()
        .enumerate()
        .map(|(slot, &value)| MultiplierSlot {
            value,
            color: colors.get(slot).copied().unwrap_or(DEFAULT_COLOR),
        })
        .collect()
}

/// Plain multiplier values (for the probability engine)
pub fn slot_values(slots: &[MultiplierSlot]) -> Vec<f64> {
    slots
        .iter()
        .map(|slot| if slot.value.is_finite() { slot.value } else { 0.0 })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Difficulty; 3] = [Difficulty::Low, Difficulty::Medium, Difficulty::High];

    #[test]
    fn test_tables_have_rows_plus_one_symmetric_slots() {
        for difficulty in ALL {
            for rows in TABLE_MIN_ROWS..=TABLE_MAX_ROWS {
                let slots = multipliers_for_rows(rows, difficulty);
                assert_eq!(slots.len(), rows as usize + 1, "{difficulty:?} {rows}");
                for i in 0..slots.len() {
                    let mirror = slots.len() - 1 - i;
                    assert_eq!(slots[i].value, slots[mirror].value, "{difficulty:?} {rows} slot {i}");
                }
            }
        }
    }

    #[test]
    fn test_color_table_matches_slot_counts() {
        for (index, colors) in SLOT_COLORS.iter().enumerate() {
            assert_eq!(colors.len(), index + TABLE_MIN_ROWS as usize + 1);
        }
    }

    #[test]
    fn test_medium_eight_rows() {
        let values = slot_values(&multipliers_for_rows(8, Difficulty::Medium));
        assert_eq!(values, vec![13.0, 3.0, 1.3, 0.7, 0.4, 0.7, 1.3, 3.0, 13.0]);
    }

    #[test]
    fn test_low_and_high_borrow_medium_colors() {
        let medium = multipliers_for_rows(12, Difficulty::Medium);
        let high = multipliers_for_rows(12, Difficulty::High);
        for (m, h) in medium.iter().zip(&high) {
            assert_eq!(m.color, h.color);
        }
        assert_eq!(high[0].value, 170.0);
    }

    #[test]
    fn test_missing_rows_degrade_to_empty() {
        assert!(multipliers_for_rows(7, Difficulty::Medium).is_empty());
        assert!(multipliers_for_rows(17, Difficulty::Low).is_empty());
    }
}
