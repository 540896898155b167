/*!
# Recipes

Recipes shipped with recast, plus helpers they share.
*/

pub mod secure_random;

pub use secure_random::{
    ApplicabilityFilter, FixCwe338, SecureRandomOptions, SecureRandomVisitor, COMMONS_LANG_2,
};

/// Move the last `n` items to the front, keeping the order within both parts
pub fn move_tail_to_front<T>(mut items: Vec<T>, n: usize) -> Vec<T> {
    let n = n.min(items.len());
    items.rotate_right(n);
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_tail_to_front() {
        assert_eq!(move_tail_to_front(vec![1, 2, 3, 4, 5], 3), vec![3, 4, 5, 1, 2]);
        assert_eq!(move_tail_to_front(vec![1, 2], 3), vec![1, 2]);
        assert_eq!(move_tail_to_front(Vec::<u8>::new(), 3), Vec::<u8>::new());
    }
}
