use {
    crate::feed::{CompetitorRecord, EventSnapshot},
    std::cmp::Ordering,
};

/// Result of evaluating a single snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome<'a> {
    /// The game is not over yet.
    Pending,
    /// The game is over but the feed has no usable pairing or scores.
    Undecidable,
    Tie,
    Winner(&'a CompetitorRecord),
}

/// Decides whether the game is concluded and, if so, who won by comparing
/// the scores of the first pairing.
pub fn resolve(snapshot: &EventSnapshot) -> Outcome<'_> {
    if !snapshot.completed {
        return Outcome::Pending;
    }
    let Some([first, second]) = &snapshot.pairing else {
        return Outcome::Undecidable;
    };
    let (Some(first_score), Some(second_score)) = (first.score, second.score) else {
        return Outcome::Undecidable;
    };
    match first_score.cmp(&second_score) {
        Ordering::Greater => Outcome::Winner(first),
        Ordering::Less => Outcome::Winner(second),
        Ordering::Equal => Outcome::Tie,
    }
}

/// Display name of the winner, if there is one.
pub fn winner(snapshot: &EventSnapshot) -> Option<&str> {
    match resolve(snapshot) {
        Outcome::Winner(competitor) => Some(&competitor.display_name),
        _ => None,
    }
}
