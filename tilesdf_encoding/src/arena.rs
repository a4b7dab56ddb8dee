// Copyright 2026 the Tilesdf Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use thiserror::Error;

/// Error returned when an [`Arena`] has no room left.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("arena `{name}` is full ({capacity} elements)")]
pub struct CapacityError {
    pub name: &'static str,
    pub capacity: u32,
}

/// Append-only storage with a fixed capacity.
///
/// Backs the per-frame logical buffers. Elements are addressed by their
/// `u32` index, which is what the GPU side sees.
#[derive(Clone, Debug)]
pub struct Arena<T> {
    name: &'static str,
    data: Vec<T>,
    capacity: u32,
}

impl<T: Copy> Arena<T> {
    pub fn new(name: &'static str, capacity: u32) -> Self {
        Self {
            name,
            data: Vec::with_capacity(capacity as usize),
            capacity,
        }
    }

    pub fn len(&self) -> u32 {
        self.data.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Number of elements that can still be pushed.
    pub fn remaining(&self) -> u32 {
        self.capacity - self.len()
    }

    /// Fails unless at least `count` more elements fit.
    pub fn check_room(&self, count: u32) -> Result<(), CapacityError> {
        if self.remaining() < count {
            return Err(self.full());
        }
        Ok(())
    }

    pub fn push(&mut self, value: T) -> Result<u32, CapacityError> {
        if self.remaining() == 0 {
            return Err(self.full());
        }
        let index = self.len();
        self.data.push(value);
        Ok(index)
    }

    /// Appends all of `values` or nothing, returning the index of the first.
    pub fn extend(&mut self, values: &[T]) -> Result<u32, CapacityError> {
        if (self.remaining() as usize) < values.len() {
            return Err(self.full());
        }
        let index = self.len();
        self.data.extend_from_slice(values);
        Ok(index)
    }

    pub fn pop(&mut self) -> Option<T> {
        self.data.pop()
    }

    pub fn truncate(&mut self, len: u32) {
        self.data.truncate(len as usize);
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn get(&self, index: u32) -> Option<&T> {
        self.data.get(index as usize)
    }

    pub fn get_mut(&mut self, index: u32) -> Option<&mut T> {
        self.data.get_mut(index as usize)
    }

    pub fn last(&self) -> Option<&T> {
        self.data.last()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    fn full(&self) -> CapacityError {
        CapacityError {
            name: self.name,
            capacity: self.capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_until_full() {
        let mut arena = Arena::new("test", 2);
        assert_eq!(arena.push(1_u32), Ok(0));
        assert_eq!(arena.push(2), Ok(1));
        let err = arena.push(3).unwrap_err();
        assert_eq!(err.capacity, 2);
        assert_eq!(arena.as_slice(), &[1, 2]);
    }

    #[test]
    fn extend_is_all_or_nothing() {
        let mut arena = Arena::new("test", 4);
        arena.push(0.0_f32).unwrap();
        assert!(arena.extend(&[1.0, 2.0, 3.0, 4.0]).is_err());
        assert_eq!(arena.len(), 1);
        assert_eq!(arena.extend(&[1.0, 2.0, 3.0]), Ok(1));
        assert_eq!(arena.remaining(), 0);
    }

    #[test]
    fn pop_releases_a_slot() {
        let mut arena = Arena::new("test", 1);
        arena.push(7_u8).unwrap();
        assert_eq!(arena.pop(), Some(7));
        assert_eq!(arena.push(8), Ok(0));
    }
}
