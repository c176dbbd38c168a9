//! Binary search with lower/upper bound bias

use crate::types::Bias;
use std::cmp::Ordering;

/// Search `haystack` (sorted by `key`) for `needle`.
///
/// On an exact match the index of the first element in the run of equal
/// keys is returned. Otherwise `Bias::GreatestLowerBound` yields the closest
/// element below the needle and `Bias::LeastUpperBound` the closest element
/// above it; `None` when no such element exists.
pub fn search<T, K, F>(needle: &K, haystack: &[T], bias: Bias, key: F) -> Option<usize>
where
    K: Ord,
    F: Fn(&T) -> K,
{
    if haystack.is_empty() {
        return None;
    }

    let len = haystack.len() as isize;
    // low and high are exclusive bounds
    let mut low: isize = -1;
    let mut high: isize = len;
    let found = loop {
        let mid = (high - low) / 2 + low;
        match needle.cmp(&key(&haystack[mid as usize])) {
            Ordering::Equal => break mid,
            Ordering::Greater => {
                if high - mid > 1 {
                    low = mid;
                    continue;
                }
                break match bias {
                    Bias::LeastUpperBound if high < len => high,
                    Bias::LeastUpperBound => -1,
                    Bias::GreatestLowerBound => mid,
                };
            }
            Ordering::Less => {
                if mid - low > 1 {
                    high = mid;
                    continue;
                }
                break match bias {
                    Bias::LeastUpperBound => mid,
                    Bias::GreatestLowerBound => low,
                };
            }
        }
    };

    if found < 0 {
        return None;
    }

    let mut index = found as usize;
    while index > 0 && key(&haystack[index]) == key(&haystack[index - 1]) {
        index -= 1;
    }
    Some(index)
}
