/// Cards a player must have in their deck to be queued or fought.
pub const DECK_SIZE: usize = 4;

pub fn is_valid_deck_size(size: usize) -> bool {
    size == DECK_SIZE
}
