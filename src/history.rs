//! Per-track temporal history.
//!
//! A [`HistoryBuffer`] holds at most `K` past observations of one track, oldest first. It is
//! owned by the track it describes and cleared whenever that track is respawned.

use ndarray::{Array2, Axis};
use std::collections::VecDeque;

use crate::error::{ColavError, Result};

/// Fixed-capacity FIFO of past observations
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryBuffer<T> {
    buffer: VecDeque<T>,
    capacity: usize,
}

impl<T> HistoryBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        HistoryBuffer {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Drop every entry; the valid length becomes zero
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Append an entry, evicting the oldest one once the buffer is full
    pub fn push(&mut self, entry: T) {
        if self.capacity == 0 {
            return;
        }
        if self.buffer.len() == self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(entry);
    }

    /// Valid length, in `0..=capacity`
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.buffer.len() == self.capacity
    }

    /// Entries from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.buffer.iter()
    }

    /// Entry `index` counted from the oldest
    pub fn get(&self, index: usize) -> Option<&T> {
        self.buffer.get(index)
    }

    /// Most recent entry
    pub fn last(&self) -> Option<&T> {
        self.buffer.back()
    }
}

impl<T: Clone> HistoryBuffer<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.buffer.iter().cloned().collect()
    }
}

/// Index of the output to read from a sequence of `valid_length` steps
pub fn selection_index(valid_length: usize) -> usize {
    valid_length.saturating_sub(1)
}

/// Zero every row whose track has no history yet
pub fn mask_empty(rows: &mut Array2<f32>, valid_lengths: &[usize]) -> Result<()> {
    if rows.nrows() != valid_lengths.len() {
        return Err(ColavError::dimension_mismatch(
            format!("{} rows", valid_lengths.len()),
            format!("{} rows", rows.nrows()),
        ));
    }
    for (mut row, &h) in rows.axis_iter_mut(Axis(0)).zip(valid_lengths) {
        if h == 0 {
            row.fill(0.0);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_push_evicts_oldest() {
        let mut history = HistoryBuffer::new(2);
        history.push(1);
        history.push(2);
        history.push(3);

        assert_eq!(history.len(), 2);
        assert_eq!(history.to_vec(), vec![2, 3]);
        assert_eq!(history.last(), Some(&3));
    }

    #[test]
    fn test_zero_capacity_never_holds_entries() {
        let mut history = HistoryBuffer::new(0);
        history.push(1.0);
        assert!(history.is_empty());
    }

    #[test]
    fn test_selection_index() {
        assert_eq!(selection_index(0), 0);
        assert_eq!(selection_index(1), 0);
        assert_eq!(selection_index(4), 3);
    }

    #[test]
    fn test_mask_empty_rows() {
        let mut rows = array![[1.0, 2.0], [3.0, 4.0]];
        mask_empty(&mut rows, &[0, 2]).unwrap();
        assert_eq!(rows, array![[0.0, 0.0], [3.0, 4.0]]);

        assert!(mask_empty(&mut rows, &[1]).is_err());
    }
}
