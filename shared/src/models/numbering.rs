//! Batch-number gap detection
//!
//! Imported registers sometimes arrive with holes in the batch sequence; the
//! UI warns about them so missing pages of a report can be chased up.

use serde::{Serialize, Serializer};
use std::collections::HashSet;

/// A missing batch number, or a run of consecutive missing numbers.
///
/// Serializes singles as plain numbers and runs as `"a-b"` strings, the shape
/// the register UI displays (`[4, "6-7"]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberGap {
    Single(i32),
    Range(i32, i32),
}

impl std::fmt::Display for NumberGap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NumberGap::Single(n) => write!(f, "{}", n),
            NumberGap::Range(a, b) => write!(f, "{}-{}", a, b),
        }
    }
}

impl Serialize for NumberGap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            NumberGap::Single(n) => serializer.serialize_i32(*n),
            NumberGap::Range(_, _) => serializer.serialize_str(&self.to_string()),
        }
    }
}

/// Numbers in `[min, max]` absent from `existing`, grouped into runs.
///
/// Pure complement of the existing set over the expected range; duplicates in
/// `existing` are harmless and an empty or inverted range yields no gaps.
pub fn find_gaps(existing: &[i32], min: i32, max: i32) -> Vec<NumberGap> {
    let present: HashSet<i32> = existing.iter().copied().collect();
    let mut gaps = Vec::new();
    let mut run_start: Option<i32> = None;

    let mut close_run = |start: Option<i32>, end: i32, gaps: &mut Vec<NumberGap>| {
        if let Some(s) = start {
            if s == end {
                gaps.push(NumberGap::Single(s));
            } else {
                gaps.push(NumberGap::Range(s, end));
            }
        }
    };

    let mut n = min;
    while n <= max {
        if present.contains(&n) {
            close_run(run_start.take(), n - 1, &mut gaps);
        } else if run_start.is_none() {
            run_start = Some(n);
        }
        n += 1;
    }
    close_run(run_start, max, &mut gaps);
    gaps
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_consecutive_missing_numbers() {
        let gaps = find_gaps(&[1, 2, 3, 5, 8, 9, 10], 1, 10);
        assert_eq!(gaps, vec![NumberGap::Single(4), NumberGap::Range(6, 7)]);
    }

    #[test]
    fn serializes_singles_as_numbers_and_runs_as_strings() {
        let gaps = find_gaps(&[1, 2, 3, 5, 8, 9, 10], 1, 10);
        let json = serde_json::to_string(&gaps).unwrap();
        assert_eq!(json, r#"[4,"6-7"]"#);
    }

    #[test]
    fn empty_register_is_one_big_gap() {
        assert_eq!(find_gaps(&[], 1, 5), vec![NumberGap::Range(1, 5)]);
    }

    #[test]
    fn complete_register_has_no_gaps() {
        assert!(find_gaps(&[1, 2, 3], 1, 3).is_empty());
    }

    #[test]
    fn inverted_range_has_no_gaps() {
        assert!(find_gaps(&[1], 5, 1).is_empty());
    }

    #[test]
    fn duplicates_are_ignored() {
        let gaps = find_gaps(&[1, 1, 3, 3], 1, 3);
        assert_eq!(gaps, vec![NumberGap::Single(2)]);
    }
}
