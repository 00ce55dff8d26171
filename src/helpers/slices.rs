/// Position of the first element equal to `needle`.
pub fn index_of<T: PartialEq>(items: &[T], needle: &T) -> Option<usize> {
    items.iter().position(|item| item == needle)
}

pub fn contains<T: PartialEq>(items: &[T], needle: &T) -> bool {
    index_of(items, needle).is_some()
}

/// A reversed copy, leaving `items` as it was.
pub fn reversed<T: Clone>(items: &[T]) -> Vec<T> {
    items.iter().rev().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_first_match() {
        let items = [3, 1, 4, 1, 5];
        assert_eq!(index_of(&items, &1), Some(1));
        assert_eq!(index_of(&items, &9), None);
        assert!(contains(&items, &5));
        assert!(!contains::<i32>(&[], &5));
    }

    #[test]
    fn reverses_without_mutating() {
        let items = vec!["a".to_owned(), "b".to_owned(), "c".to_owned()];
        assert_eq!(reversed(&items), vec!["c", "b", "a"]);
        assert_eq!(items, vec!["a", "b", "c"]);
        assert!(reversed::<u8>(&[]).is_empty());
    }
}
