//! Conditional composite sort key for merged rows.
//!
//! Primary key: if the address starts with a ward (a leading substring
//! ending in the marker `区`), rows are grouped by that substring; otherwise
//! the full address is the key. Secondary key on ties: the `number` column,
//! either as a plain string or numerically by its embedded digit runs
//! (`"9番"` before `"10番"`).
//!
//! String comparison is Unicode code point order. The browser original used
//! locale-aware collation; all orderings this tool depends on (digit
//! strings, CJK ward keys) come out the same either way.

use std::cmp::Ordering;

use super::NormalizedRow;

/// Character that terminates a ward prefix in an address.
const WARD_MARKER: char = '区';

/// How the merged dataset is ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    /// Original concatenation order.
    #[default]
    None,
    /// Ward key, then `number` compared as a string.
    Lexicographic,
    /// Ward key, then `number` compared by its digit runs.
    Numeric,
}

/// The address's primary sort key: up to and including the first `区`, or
/// the whole address when no ward marker is present.
pub(crate) fn ward_key(address: &str) -> &str {
    match address.find(WARD_MARKER) {
        Some(i) => &address[..i + WARD_MARKER.len_utf8()],
        None => address,
    }
}

/// Maximal ASCII digit runs of `s`, in order, as integers.
///
/// `"1-2番"` → `[1, 2]`. Overlong runs saturate rather than overflow.
pub(crate) fn digit_runs(s: &str) -> Vec<i64> {
    let mut runs = Vec::new();
    let mut current: Option<i64> = None;
    for ch in s.chars() {
        if let Some(d) = ch.to_digit(10) {
            current = Some(
                current
                    .unwrap_or(0)
                    .saturating_mul(10)
                    .saturating_add(d as i64),
            );
        } else if let Some(v) = current.take() {
            runs.push(v);
        }
    }
    if let Some(v) = current {
        runs.push(v);
    }
    runs
}

/// Numeric comparison of two `number` strings.
///
/// Digit runs are compared element-wise; a missing element counts as -1, so
/// a shorter sequence sorts before any extension of it. Fully equal runs
/// fall back to plain string order as the final tie-break.
fn numeric_number_cmp(a: &str, b: &str) -> Ordering {
    let ra = digit_runs(a);
    let rb = digit_runs(b);
    for i in 0..ra.len().max(rb.len()) {
        let va = ra.get(i).copied().unwrap_or(-1);
        let vb = rb.get(i).copied().unwrap_or(-1);
        match va.cmp(&vb) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    a.cmp(b)
}

/// Two-key comparator applied by [`CsvMerger`](super::CsvMerger) under
/// `Lexicographic` and `Numeric` modes.
pub(crate) fn compare_rows(a: &NormalizedRow, b: &NormalizedRow, mode: SortMode) -> Ordering {
    match ward_key(&a.address).cmp(ward_key(&b.address)) {
        Ordering::Equal => match mode {
            SortMode::None => Ordering::Equal,
            SortMode::Lexicographic => a.number.cmp(&b.number),
            SortMode::Numeric => numeric_number_cmp(&a.number, &b.number),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ward_key() {
        assert_eq!(ward_key("中央区本町1"), "中央区");
        assert_eq!(ward_key("郊外団地A"), "郊外団地A");
        assert_eq!(ward_key(""), "");
        // Only the first marker terminates the key
        assert_eq!(ward_key("北区東区画3"), "北区");
    }

    #[test]
    fn test_digit_runs() {
        assert_eq!(digit_runs("9番"), vec![9]);
        assert_eq!(digit_runs("1-22番"), vec![1, 22]);
        assert_eq!(digit_runs("番外"), Vec::<i64>::new());
        assert_eq!(digit_runs("05"), vec![5]);
    }

    #[test]
    fn test_numeric_orders_by_value() {
        assert_eq!(numeric_number_cmp("9番", "10番"), Ordering::Less);
        assert_eq!(numeric_number_cmp("10番", "9番"), Ordering::Greater);
    }

    #[test]
    fn test_lexicographic_orders_by_string() {
        // "1" < "9" as strings, so "10番" precedes "9番"
        assert!("10番" < "9番");
    }

    #[test]
    fn test_shorter_run_sequence_sorts_first() {
        // [1] vs [1, 2]: the missing second element counts as -1
        assert_eq!(numeric_number_cmp("1番", "1-2番"), Ordering::Less);
    }

    #[test]
    fn test_equal_runs_fall_back_to_string() {
        assert_eq!(numeric_number_cmp("3番", "3号"), "3番".cmp("3号"));
    }
}
