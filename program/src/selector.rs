// Raffle Sweeper - Winner selection
use rand::Rng;
use std::collections::HashSet;

/// Draw `count` distinct participants uniformly at random without replacement.
///
/// Winners come back in the order drawn, which decides code assignment. `count` is
/// clamped to the number of participants. Participants are expected to be distinct.
///
/// Indices are drawn with `gen_range` and rejected when already taken, so the cost
/// grows as `count` approaches the pool size.
pub fn draw_winners<T, R>(participants: &[T], count: usize, rng: &mut R) -> Vec<T>
where
    T: Clone,
    R: Rng + ?Sized,
{
    let count = count.min(participants.len());
    let mut taken = HashSet::with_capacity(count);
    let mut winners = Vec::with_capacity(count);

    while winners.len() < count {
        let index = rng.gen_range(0..participants.len());
        if taken.insert(index) {
            winners.push(participants[index].clone());
        }
    }

    winners
}
