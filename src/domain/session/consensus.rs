//! Most-common-vote resolution.

use std::collections::HashMap;

use super::HIDDEN_VOTE;

/// Returns the most popular vote value, if any votes were counted.
///
/// Masked values are ignored. Ties go to the candidate ranked highest in
/// `deck_order` (later index wins). Candidates missing from the ordering
/// never beat a ranked one; between unranked candidates the greatest string
/// wins so the result does not depend on iteration order.
pub fn most_common_vote<'a, I>(votes: I, deck_order: &[&str]) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in votes {
        if value != HIDDEN_VOTE {
            *counts.entry(value).or_insert(0) += 1;
        }
    }

    let max = counts.values().copied().max()?;
    let rank = |value: &str| deck_order.iter().position(|v| *v == value);

    counts
        .into_iter()
        .filter(|(_, count)| *count == max)
        .map(|(value, _)| value)
        .max_by(|a, b| rank(a).cmp(&rank(b)).then_with(|| a.cmp(b)))
        .map(str::to_string)
}
