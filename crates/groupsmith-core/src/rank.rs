//! Group rank comparison.
//!
//! Orders groups by ordinal level plus an optional single-letter sub-level
//! suffix, so `"L6A" < "L6B" < "L7"`. Wildcard groups are incomparable.

use std::cell::RefCell;
use std::collections::HashMap;

/// Ordered rank of a group name: level first, then sub-level suffix.
///
/// # Example
///
/// ```
/// use groupsmith_core::rank::RankComparator;
///
/// let ranks = RankComparator::new(vec!["JK".into(), "SK".into()], "OPEN".into());
/// let l6a = ranks.rank("L6A").unwrap();
/// let l6b = ranks.rank("L6B").unwrap();
/// let l7 = ranks.rank("L7").unwrap();
/// assert!(l6a < l6b);
/// assert!(l6b < l7);
/// assert!(ranks.rank("OPEN-8").is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupRank {
    /// Named levels rank 0, 1, ...; numeric level `n` ranks `n + 1`.
    pub level: i32,
    /// `A` = 1, `B` = 2, ...; no suffix = 0.
    pub suffix: i32,
}

impl GroupRank {
    pub fn new(level: i32, suffix: i32) -> Self {
        Self { level, suffix }
    }
}

/// Parses and compares group names by `(level, suffix)` rank.
///
/// Groups with different eligibility at the same level and suffix compare
/// equal: eligibility plays no part in ranking. Results are memoised per
/// name; the memo is a performance aid only.
#[derive(Debug)]
pub struct RankComparator {
    named_levels: Vec<String>,
    wildcard_marker: String,
    memo: RefCell<HashMap<String, Option<GroupRank>>>,
}

impl RankComparator {
    /// `named_levels` are ordinal level names ranking 0, 1, ... before any
    /// numeric level. `wildcard_marker` marks any-eligibility group names,
    /// which have no rank.
    pub fn new(named_levels: Vec<String>, wildcard_marker: String) -> Self {
        Self {
            named_levels,
            wildcard_marker,
            memo: RefCell::new(HashMap::new()),
        }
    }

    /// Rank of a group name, or `None` when the name is unrankable
    /// (wildcard marker, unknown named level, or no numeric level).
    pub fn rank(&self, name: &str) -> Option<GroupRank> {
        if let Some(cached) = self.memo.borrow().get(name) {
            return *cached;
        }
        let computed = self.parse(name);
        self.memo
            .borrow_mut()
            .insert(name.to_string(), computed);
        computed
    }

    /// Compares two group names; `None` when either side is unrankable.
    pub fn compare(&self, a: &str, b: &str) -> Option<std::cmp::Ordering> {
        Some(self.rank(a)?.cmp(&self.rank(b)?))
    }

    fn parse(&self, name: &str) -> Option<GroupRank> {
        let trimmed = name.trim();
        if !self.wildcard_marker.is_empty() && trimmed.contains(&self.wildcard_marker) {
            return None;
        }

        // Exact named level, with or without a suffix letter.
        for (idx, named) in self.named_levels.iter().enumerate() {
            if trimmed.eq_ignore_ascii_case(named) {
                return Some(GroupRank::new(idx as i32, 0));
            }
            if let Some(rest) = strip_prefix_ignore_case(trimmed, named) {
                if let Some(suffix) = single_suffix(rest) {
                    return Some(GroupRank::new(idx as i32, suffix));
                }
            }
        }

        // Numeric level with optional leading letters and one trailing
        // suffix letter: "L6A", "6A", "L7".
        let digits_start = trimmed.find(|c: char| c.is_ascii_digit())?;
        let (_, tail) = trimmed.split_at(digits_start);
        let digits_end = tail
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(tail.len());
        let (digits, rest) = tail.split_at(digits_end);
        let number: i32 = digits.parse().ok()?;
        let suffix = if rest.is_empty() {
            0
        } else {
            single_suffix(rest)?
        };
        Some(GroupRank::new(number + 1, suffix))
    }
}

fn strip_prefix_ignore_case<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    if name.len() >= prefix.len() && name[..prefix.len()].eq_ignore_ascii_case(prefix) {
        Some(&name[prefix.len()..])
    } else {
        None
    }
}

/// Suffix rank of a single trailing letter: `A` = 1, `B` = 2, ...
fn single_suffix(rest: &str) -> Option<i32> {
    let mut chars = rest.chars();
    let c = chars.next()?;
    if chars.next().is_some() || !c.is_ascii_alphabetic() {
        return None;
    }
    Some(c.to_ascii_uppercase() as i32 - 'A' as i32 + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranks() -> RankComparator {
        RankComparator::new(vec!["JK".into(), "SK".into()], "OPEN".into())
    }

    #[test]
    fn suffix_orders_within_level() {
        let r = ranks();
        assert!(r.rank("L6A").unwrap() < r.rank("L6B").unwrap());
        assert!(r.rank("L6B").unwrap() < r.rank("L7").unwrap());
    }

    #[test]
    fn unsuffixed_sorts_before_suffixed() {
        let r = ranks();
        assert!(r.rank("L6").unwrap() < r.rank("L6A").unwrap());
    }

    #[test]
    fn named_levels_rank_below_numeric() {
        let r = ranks();
        assert_eq!(r.rank("JK").unwrap(), GroupRank::new(0, 0));
        assert_eq!(r.rank("SK").unwrap(), GroupRank::new(1, 0));
        assert!(r.rank("sk-B").is_none());
        assert_eq!(r.rank("SKB").unwrap(), GroupRank::new(1, 2));
        assert!(r.rank("SK").unwrap() < r.rank("L1").unwrap());
    }

    #[test]
    fn wildcard_is_incomparable() {
        let r = ranks();
        assert!(r.rank("OPEN-8").is_none());
        assert!(r.compare("OPEN-8", "L6A").is_none());
    }

    #[test]
    fn garbage_names_have_no_rank() {
        let r = ranks();
        assert!(r.rank("lodge").is_none());
        assert!(r.rank("L6AB").is_none());
        assert!(r.rank("").is_none());
    }

    #[test]
    fn numeric_rank_is_number_plus_one() {
        let r = ranks();
        assert_eq!(r.rank("L6").unwrap(), GroupRank::new(7, 0));
        assert_eq!(r.rank("6A").unwrap(), GroupRank::new(7, 1));
    }

    #[test]
    fn memo_returns_consistent_results() {
        let r = ranks();
        let first = r.rank("L6A");
        let second = r.rank("L6A");
        assert_eq!(first, second);
    }
}
