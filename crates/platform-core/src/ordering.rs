//! Monitor ordering compatible with lemonbar.
//!
//! Bars assign segments to monitors by index, so the order has to match what
//! lemonbar produces for the same layout. Its comparator is reproduced as is:
//! it is not a strict weak ordering. For diagonally placed monitors both
//! `compare(a, b)` and `compare(b, a)` can be `Less`; [`sort_monitors`] treats
//! such a pair as equal and keeps its discovery order.

use std::cmp::Ordering;

use crate::monitor::MonitorOutput;

/// Three-way comparison between two monitors.
///
/// `a` sorts first when it is further left, or when `b` starts at or below
/// the bottom edge of `a`.
pub fn compare_monitors(a: &MonitorOutput, b: &MonitorOutput) -> Ordering {
    let a_bottom = i64::from(a.y) + i64::from(a.height);
    let b_top = i64::from(b.y);

    if a.x < b.x || a_bottom <= b_top {
        Ordering::Less
    } else if a.x > b.x || a_bottom > b_top {
        Ordering::Greater
    } else {
        Ordering::Equal
    }
}

/// Whether `a` sorts strictly before `b`: `a` compares `Less` and `b` does
/// not also compare `Less` against `a`.
fn sorts_before(a: &MonitorOutput, b: &MonitorOutput) -> bool {
    compare_monitors(a, b) == Ordering::Less && compare_monitors(b, a) != Ordering::Less
}

/// Sort monitors in place with [`compare_monitors`].
///
/// Stable insertion sort: an element only moves in front of its predecessor
/// when it sorts strictly before it. Pairs that compare `Less` both ways are
/// equal and keep their relative order, so sorting an already sorted slice
/// leaves it untouched. `slice::sort_by` is not used because it may panic on
/// comparators that are not total orders.
pub fn sort_monitors<M: AsRef<MonitorOutput>>(monitors: &mut [M]) {
    for i in 1..monitors.len() {
        let mut j = i;
        while j > 0 && sorts_before(monitors[j].as_ref(), monitors[j - 1].as_ref()) {
            monitors.swap(j, j - 1);
            j -= 1;
        }
    }
}
