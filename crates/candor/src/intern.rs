//! The root-scope constant pool.
//!
//! Literals are interned into the root scope so identical literals share one
//! storage slot; `Literal` instructions carry the slot index. Slots are
//! handed out in first-intern order and stay stable for the lifetime of the
//! pool, which is what lets the embedding host materialize the pool as the
//! process-wide root object at runtime initialization.

use indexmap::IndexSet;

/// A slot in the root scope's constant pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct RootSlot(u32);

impl RootSlot {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Which literal family a pooled constant belongs to. Keys with equal text
/// but different kinds (`1` the number, `"1"` the string) get distinct
/// slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum LiteralKind {
    Number,
    String,
    True,
    False,
}

/// Insertion-ordered literal pool.
#[derive(Debug, Default)]
pub struct RootPool {
    entries: IndexSet<(LiteralKind, Box<str>), ahash::RandomState>,
}

impl RootPool {
    /// Returns the slot for `(kind, text)`, allocating one on first sight.
    pub fn intern(&mut self, kind: LiteralKind, text: &str) -> RootSlot {
        let (index, _) = self.entries.insert_full((kind, Box::from(text)));
        RootSlot(index as u32)
    }

    /// The pooled constant at `slot`.
    #[must_use]
    pub fn get(&self, slot: RootSlot) -> Option<(LiteralKind, &str)> {
        self.entries
            .get_index(slot.index())
            .map(|(kind, text)| (*kind, &**text))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
