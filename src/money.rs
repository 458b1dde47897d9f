//! Money handling in integer minor units.
//!
//! Amounts cross the API as decimals with two meaningful fractional digits.
//! Everything that adds, subtracts or divides money works on cents instead.

use std::collections::{BTreeMap, BTreeSet};

pub type Cents = i64;

/// Largest single amount the service accepts: 10 billion in major units.
pub const MAX_CENTS: Cents = 1_000_000_000_000;

/// Converts a decimal amount to cents. Sub-cent digits are rounded away.
pub fn to_cents(amount: f64) -> Cents {
    (amount * 100.0).round() as Cents
}

pub fn to_money(cents: Cents) -> f64 {
    cents as f64 / 100.0
}

/// Whether no whole cent is left. Integer cents cannot carry a residue, so
/// this is the zero test used by the matcher.
pub fn is_nearly_zero(cents: Cents) -> bool {
    cents.abs() < 1
}

/// Splits `total_cents` equally among `participants`.
///
/// Duplicated ids count once. The remainder goes one cent at a time to the
/// smallest ids in string order, so the result does not depend on the input
/// order and the shares always sum to `total_cents`. No participants means no
/// shares.
pub fn split_evenly<'a, I>(total_cents: Cents, participants: I) -> BTreeMap<&'a str, Cents>
where
    I: IntoIterator<Item = &'a str>,
{
    let sorted: BTreeSet<&str> = participants.into_iter().collect();
    if sorted.is_empty() {
        return BTreeMap::new();
    }
    let n = sorted.len() as Cents;
    let base = total_cents.div_euclid(n);
    let remainder = total_cents.rem_euclid(n) as usize;

    sorted
        .into_iter()
        .enumerate()
        .map(|(idx, id)| (id, base + Cents::from(idx < remainder)))
        .collect()
}
