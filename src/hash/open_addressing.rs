//! Open-addressing hash table keyed by a precomputed `u64` hash, with linear
//! probing and a salt (top 16 bits of the hash) stored per slot as a cheap
//! pre-filter before the caller's real comparison runs. Resizes at a load
//! factor of 0.7.
//!
//! This is the pluggable-callback table the join and group-by engines build
//! on: both key rows by index, but compare/equal differently (row tuple
//! equality for joins, key-column equality for group-by), so the table
//! itself only stores `(salt, payload)` slots and leaves comparison to the
//! caller.

use crate::common::constants::HASH_TABLE_MAX_LOAD;

#[derive(Clone, Copy)]
struct Slot<T> {
    salt: u16,
    hash: u64,
    payload: T,
}

fn salt_of(hash: u64) -> u16 {
    (hash >> 48) as u16
}

/// Open-addressing table mapping a `u64` hash to a caller-defined payload
/// (usually a row index or group id).
pub struct OpenAddressTable<T: Copy> {
    slots: Vec<Option<Slot<T>>>,
    mask: usize,
    len: usize,
}

impl<T: Copy> OpenAddressTable<T> {
    pub fn with_capacity(min_capacity: usize) -> Self {
        let cap = (min_capacity.max(8)).next_power_of_two();
        OpenAddressTable {
            slots: vec![None; cap],
            mask: cap - 1,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn load_factor(&self) -> f64 {
        self.len as f64 / self.slots.len() as f64
    }

    /// Probe for an existing payload matching `hash` for which `eq` returns
    /// true. Returns `None` if no such slot exists (the caller should insert).
    pub fn find<F>(&self, hash: u64, mut eq: F) -> Option<T>
    where
        F: FnMut(T) -> bool,
    {
        let salt = salt_of(hash);
        let mut idx = hash as usize & self.mask;
        loop {
            match &self.slots[idx] {
                None => return None,
                Some(slot) => {
                    if slot.salt == salt && slot.hash == hash && eq(slot.payload) {
                        return Some(slot.payload);
                    }
                }
            }
            idx = (idx + 1) & self.mask;
        }
    }

    /// Insert `payload` keyed by `hash` if no existing slot matches via `eq`;
    /// first-insertion-wins (used by the left-join index build). Returns the
    /// payload that ends up occupying the slot (either the existing one, or
    /// the newly inserted one).
    pub fn insert_if_absent<F>(&mut self, hash: u64, payload: T, mut eq: F) -> T
    where
        F: FnMut(T) -> bool,
    {
        if self.load_factor() >= HASH_TABLE_MAX_LOAD {
            self.grow();
        }
        let salt = salt_of(hash);
        let mut idx = hash as usize & self.mask;
        loop {
            match &self.slots[idx] {
                None => {
                    self.slots[idx] = Some(Slot { salt, hash, payload });
                    self.len += 1;
                    return payload;
                }
                Some(slot) => {
                    if slot.salt == salt && slot.hash == hash && eq(slot.payload) {
                        return slot.payload;
                    }
                }
            }
            idx = (idx + 1) & self.mask;
        }
    }

    /// Find a matching slot, or create one via `make` if absent. Returns
    /// `(payload, was_newly_created)` — the shape the group-by engine's
    /// `find_or_create` needs.
    pub fn find_or_create<F, M>(&mut self, hash: u64, mut eq: F, make: M) -> (T, bool)
    where
        F: FnMut(T) -> bool,
        M: FnOnce() -> T,
    {
        if self.load_factor() >= HASH_TABLE_MAX_LOAD {
            self.grow();
        }
        let salt = salt_of(hash);
        let mut idx = hash as usize & self.mask;
        loop {
            match &self.slots[idx] {
                None => {
                    let payload = make();
                    self.slots[idx] = Some(Slot { salt, hash, payload });
                    self.len += 1;
                    return (payload, true);
                }
                Some(slot) => {
                    if slot.salt == salt && slot.hash == hash && eq(slot.payload) {
                        return (slot.payload, false);
                    }
                }
            }
            idx = (idx + 1) & self.mask;
        }
    }

    fn grow(&mut self) {
        let new_cap = self.slots.len() * 2;
        let old = std::mem::replace(&mut self.slots, vec![None; new_cap]);
        self.mask = new_cap - 1;
        self.len = 0;
        for slot in old.into_iter().flatten() {
            let mut idx = slot.hash as usize & self.mask;
            loop {
                if self.slots[idx].is_none() {
                    self.slots[idx] = Some(slot);
                    self.len += 1;
                    break;
                }
                idx = (idx + 1) & self.mask;
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, T)> + '_ {
        self.slots.iter().filter_map(|s| s.as_ref().map(|s| (s.hash, s.payload)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_find() {
        let mut t: OpenAddressTable<i64> = OpenAddressTable::with_capacity(8);
        t.insert_if_absent(100, 7, |p| p == 7);
        assert_eq!(t.find(100, |p| p == 7), Some(7));
        assert_eq!(t.find(100, |p| p == 8), None);
    }

    #[test]
    fn first_insertion_wins() {
        let mut t: OpenAddressTable<i64> = OpenAddressTable::with_capacity(8);
        let first = t.insert_if_absent(42, 1, |_| true);
        let second = t.insert_if_absent(42, 2, |_| true);
        assert_eq!(first, 1);
        assert_eq!(second, 1);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn grows_past_load_factor() {
        let mut t: OpenAddressTable<i64> = OpenAddressTable::with_capacity(8);
        for i in 0..100i64 {
            t.insert_if_absent(i as u64 * 7919, i, |p| p == i);
        }
        assert_eq!(t.len(), 100);
        assert!(t.capacity() >= 100);
        for i in 0..100i64 {
            assert_eq!(t.find(i as u64 * 7919, |p| p == i), Some(i));
        }
    }

    #[test]
    fn find_or_create_creates_once() {
        let mut t: OpenAddressTable<i64> = OpenAddressTable::with_capacity(8);
        let (id1, created1) = t.find_or_create(9, |p| p == 0, || 0);
        let (id2, created2) = t.find_or_create(9, |p| p == 0, || 99);
        assert!(created1);
        assert!(!created2);
        assert_eq!(id1, id2);
    }
}
