//! Fixed-size, direct-mapped transposition table

use std::mem;

use crate::position::Move;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Bound {
    Exact,
    /// The true value is at least `value`
    Lower,
    /// The true value is at most `value`
    Upper,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Entry {
    pub hash: u64,
    pub value: i64,
    pub depth: u8,
    pub bound: Bound,
    pub best_move: Option<Move>,
    pub generation: u8,
}

impl Entry {
    /// Whether the stored value decides a node searched to `depth` with window `(alpha, beta)`
    pub fn cuts(&self, depth: u8, alpha: i64, beta: i64) -> bool {
        self.depth >= depth
            && match self.bound {
                Bound::Exact => true,
                Bound::Lower => self.value >= beta,
                Bound::Upper => self.value <= alpha,
            }
    }
}

pub const ENTRY_SIZE: usize = mem::size_of::<Option<Entry>>();

pub struct TranspositionTable {
    slots: Vec<Option<Entry>>,
    generation: u8,
}

impl TranspositionTable {
    /// A table using at most `table_mem` bytes, with at least one slot
    pub fn new(table_mem: usize) -> Self {
        let slots = (table_mem / ENTRY_SIZE).max(1);
        let capacity = 1 << slots.ilog2();
        TranspositionTable {
            slots: vec![None; capacity],
            generation: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn generation(&self) -> u8 {
        self.generation
    }

    /// Marks every existing entry as stale
    pub fn new_search(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    fn index(&self, hash: u64) -> usize {
        hash as usize & (self.slots.len() - 1)
    }

    pub fn get(&self, hash: u64) -> Option<&Entry> {
        self.slots[self.index(hash)]
            .as_ref()
            .filter(|entry| entry.hash == hash)
    }

    pub fn insert(
        &mut self,
        hash: u64,
        depth: u8,
        value: i64,
        bound: Bound,
        best_move: Option<Move>,
    ) {
        let generation = self.generation;
        let index = self.index(hash);
        let slot = &mut self.slots[index];
        let replace = match slot {
            None => true,
            Some(old) => old.generation != generation || depth >= old.depth,
        };
        if replace {
            *slot = Some(Entry {
                hash,
                value,
                depth,
                bound,
                best_move,
                generation,
            });
        }
    }

    pub fn used_entries(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.generation = 0;
    }
}
