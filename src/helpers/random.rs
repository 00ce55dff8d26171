use std::ops::Range;

use rand::{distributions::Alphanumeric, seq::SliceRandom, Rng};

/// Random ASCII letters and digits.
pub fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// A number in `range`, or `None` if the range is empty.
pub fn random_number(range: Range<i64>) -> Option<i64> {
    if range.is_empty() {
        return None;
    }
    Some(rand::thread_rng().gen_range(range))
}

pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    rand::thread_rng().fill(buf.as_mut_slice());
    buf
}

pub fn pick<T>(items: &[T]) -> Option<&T> {
    items.choose(&mut rand::thread_rng())
}
