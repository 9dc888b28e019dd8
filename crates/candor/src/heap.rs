//! The garbage-collected heap as the inline caches see it.
//!
//! The heap itself lives in the embedding host; this module pins down the
//! narrow interface the PIC consumes: tagged-word inspection, prototype
//! loads, and weak/strong reference registration against raw slot
//! addresses. Addresses are plain machine words; the host owns the memory
//! they denote.

/// A tagged machine word: an unboxed small integer or a heap pointer.
pub type Word = u64;

/// Address of a word-sized slot holding a heap reference (a cell inside a
/// code chunk or a runtime table).
pub type SlotAddr = u64;

/// Sentinel prototype installed on objects that opt out of inline caching.
/// An all-ones marker; no real heap pointer collides with it.
pub const IC_DISABLED: Word = Word::MAX;

/// Heap tag of a word, as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum HeapTag {
    Nil,
    Smi,
    HeapNumber,
    String,
    Boolean,
    Object,
    Array,
    Function,
}

/// How a registered reference behaves across collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RefKind {
    /// The slot keeps its referent alive.
    Strong,
    /// The slot is nulled when the referent dies.
    Weak,
}

/// The GC surface the PIC needs. Mock implementations drive the tests; the
/// embedding host provides the real one.
pub trait Heap {
    /// Registers `slot` (currently holding `value`) with the collector.
    fn reference(&mut self, kind: RefKind, slot: SlotAddr, value: Word);

    /// Unregisters `slot` before its backing memory moves or is freed.
    fn dereference(&mut self, slot: SlotAddr, value: Word);

    /// The heap tag of a word.
    fn tag_of(&self, value: Word) -> HeapTag;

    /// The prototype of an object word. Only meaningful when
    /// [`Heap::tag_of`] reported [`HeapTag::Object`].
    fn proto_of(&self, object: Word) -> Word;
}
