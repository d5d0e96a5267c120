// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Natural string ordering: embedded digit runs compare by numeric value
// rather than lexically, so `page2` sorts before `page10`.

use std::cmp::Ordering;

/// Compare two strings in natural order.
///
/// Digit runs are compared by value, with the shorter run first on ties so
/// `01` sorts before `001`; everything else compares byte-wise.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut ia = a.as_bytes().iter().copied().peekable();
    let mut ib = b.as_bytes().iter().copied().peekable();

    loop {
        match (ia.peek().copied(), ib.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(ca), Some(cb)) => {
                if ca.is_ascii_digit() && cb.is_ascii_digit() {
                    let (va, la) = take_number(&mut ia);
                    let (vb, lb) = take_number(&mut ib);
                    match va.cmp(&vb).then(la.cmp(&lb)) {
                        Ordering::Equal => {}
                        other => return other,
                    }
                } else {
                    match ca.cmp(&cb) {
                        Ordering::Equal => {
                            ia.next();
                            ib.next();
                        }
                        other => return other,
                    }
                }
            }
        }
    }
}

/// Consume a digit run, returning its numeric value and length. Values are
/// saturated at `u128::MAX`; runs that long do not occur in page names.
fn take_number(it: &mut std::iter::Peekable<impl Iterator<Item = u8>>) -> (u128, usize) {
    let mut value: u128 = 0;
    let mut len = 0;
    while let Some(c) = it.peek().copied() {
        if !c.is_ascii_digit() {
            break;
        }
        value = value.saturating_mul(10).saturating_add((c - b'0') as u128);
        len += 1;
        it.next();
    }
    (value, len)
}

/// Sort a list of strings in place using [`natural_cmp`].
pub fn sort(items: &mut [String]) {
    items.sort_by(|a, b| natural_cmp(a, b));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_runs_compare_by_value() {
        assert_eq!(natural_cmp("page2", "page10"), Ordering::Less);
        assert_eq!(natural_cmp("page10", "page2"), Ordering::Greater);
        assert_eq!(natural_cmp("page2", "page2"), Ordering::Equal);
    }

    #[test]
    fn mixed_text_falls_back_to_bytes() {
        assert_eq!(natural_cmp("alpha", "beta"), Ordering::Less);
        assert_eq!(natural_cmp("a10b2", "a10b10"), Ordering::Less);
    }

    #[test]
    fn leading_zeros_do_not_change_value_order() {
        assert_eq!(natural_cmp("page002", "page3"), Ordering::Less);
        assert_eq!(natural_cmp("page01", "page001"), Ordering::Less);
    }

    #[test]
    fn sort_orders_pages_naturally() {
        let mut names = vec![
            "page10.jpg".to_string(),
            "page2.jpg".to_string(),
            "page1.jpg".to_string(),
        ];
        sort(&mut names);
        assert_eq!(names, ["page1.jpg", "page2.jpg", "page10.jpg"]);
    }
}
