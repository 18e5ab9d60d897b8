// 🏅 Ranker - orders scored candidates and numbers them three ways
//
// Sorted by score descending, ties broken by register id ascending:
// - rank_dense:       1, 2, 2, 3   (ties share, no gaps)
// - rank_competition: 1, 2, 2, 4   (ties share, 1 + count strictly ahead)
// - row_number:       1, 2, 3, 4   (strict total order)
//
// Ranks only make sense over the complete set, so this runs after every
// candidate has been scored.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ranked<T> {
    pub item: T,
    pub rank_dense: u32,
    pub rank_competition: u32,
    pub row_number: u32,
}

/// Rank `items` by `score` (descending), tie-breaking on `id` (ascending).
pub fn rank_by<T, S, I>(mut items: Vec<T>, score: S, id: I) -> Vec<Ranked<T>>
where
    S: Fn(&T) -> f64,
    I: Fn(&T) -> &str,
{
    items.sort_by(|a, b| {
        score(b)
            .total_cmp(&score(a))
            .then_with(|| id(a).cmp(id(b)))
    });

    let mut ranked = Vec::with_capacity(items.len());
    let mut previous: Option<f64> = None;
    let mut dense = 0u32;
    let mut competition = 0u32;

    for (index, item) in items.into_iter().enumerate() {
        let row_number = index as u32 + 1;
        let current = score(&item);

        if previous != Some(current) {
            dense += 1;
            competition = row_number;
            previous = Some(current);
        }

        ranked.push(Ranked {
            item,
            rank_dense: dense,
            rank_competition: competition,
            row_number,
        });
    }

    ranked
}
