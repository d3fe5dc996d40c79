// Raffle Sweeper - Prize code allocation

/// Codes split between drawn winners and the leftover pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation<T> {
    /// Each winner in draw order with the code it received
    pub assignments: Vec<(T, Option<String>)>,
    /// Codes beyond the winner count, in pool order
    pub unused_codes: Vec<String>,
}

/// Hand out `codes` front to back to `winners` in draw order.
///
/// Winners past the end of the pool get no code; codes past the end of the
/// winner list become unused.
pub fn allocate_codes<T: Clone>(codes: &[String], winners: &[T]) -> Allocation<T> {
    let mut pool = codes.iter().cloned();
    let assignments = winners
        .iter()
        .map(|winner| (winner.clone(), pool.next()))
        .collect();

    Allocation {
        assignments,
        unused_codes: pool.collect(),
    }
}

/// Codes of the pool not handed to any existing winner, in pool order
pub fn remaining_codes<'a, I>(codes: &[String], assigned: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut assigned: Vec<&str> = assigned.into_iter().collect();
    codes
        .iter()
        .filter(|code| {
            // A code listed twice in the pool is consumed once per assignment
            match assigned.iter().position(|taken| *taken == code.as_str()) {
                Some(index) => {
                    assigned.swap_remove(index);
                    false
                }
                None => true,
            }
        })
        .cloned()
        .collect()
}
