//! Polymorphic inline caches.
//!
//! Each property-access site in compiled code calls through a patchable
//! word. The word initially targets a PIC chunk that tests the receiver's
//! prototype against a short cached list and falls through to the runtime
//! miss handler, which grows the cache, regenerates the chunk, and patches
//! the call site to the new chunk. The patch is a single aligned word
//! store, performed on the runtime's own thread.
//!
//! Cached prototypes are registered as weak references, so a collection can
//! null a compare cell without keeping the prototype alive; a nulled cell
//! is a permanent miss for its slot and gets refilled by the next miss.
//! After [`Pic::MAX_SIZE`] distinct prototypes the next miss rewrites the
//! call site to the generic lookup stub and the cache retires.
//!
//! # Chunk layout
//!
//! The chunk is the compare table the emitter lowers to machine code:
//!
//! ```text
//! word 0        entry marker (receiver tag check descriptor)
//! word 1        entry count n
//! word 2 + 2i   prototype i     <- weak-referenced cell
//! word 3 + 2i   result i
//! word 2 + 2n   fallback: generic lookup stub address
//! ```
//!
//! The prototype cell offsets are recorded at generation time so the heap's
//! weak-reference system can null them on collection.

use crate::{
    code::{CodeSpace, WORD_SIZE},
    heap::{Heap, HeapTag, IC_DISABLED, RefKind, SlotAddr, Word},
};

/// Marker word opening every PIC chunk.
pub const PIC_ENTRY_MARKER: Word = 0x0043_4950; // "PIC"

/// How many words before the caller ip the miss handler scans for the
/// call-site cell.
const PATCH_WINDOW_WORDS: u64 = 4;

/// A polymorphic inline cache for one property-access site.
#[derive(Debug, Default)]
pub struct Pic {
    chunk: Option<crate::code::ChunkId>,
    chunk_addr: Word,
    /// Observed prototypes, in observation order.
    protos: Vec<Word>,
    /// Cached lookup results, parallel to `protos`.
    results: Vec<Word>,
    /// Word offset of each prototype cell within the current chunk.
    proto_offsets: Vec<usize>,
}

impl Pic {
    /// Saturation bound: one more distinct prototype retires the cache.
    pub const MAX_SIZE: usize = 5;

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached prototypes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.protos.len()
    }

    /// Base address of the current chunk; zero once retired.
    #[must_use]
    pub fn chunk_addr(&self) -> Word {
        self.chunk_addr
    }

    /// Publishes the initial (empty) chunk and returns its address for the
    /// emitter to plant at the call site.
    pub fn install<S: CodeSpace>(&mut self, space: &mut S) -> Word {
        debug_assert!(self.chunk.is_none(), "PIC installed twice");
        let stub = space.lookup_property_stub();
        let chunk = space.create_chunk("__pic__");
        space.put(chunk, vec![PIC_ENTRY_MARKER, 0, stub]);
        self.chunk = Some(chunk);
        self.chunk_addr = space.addr(chunk);
        self.chunk_addr
    }

    /// The `(prototype, result)` pairs the current chunk tests, in order.
    /// Reads through the code space, so GC-nulled cells show as zero.
    #[must_use]
    pub fn cached<S: CodeSpace>(&self, space: &S) -> Vec<(Word, Word)> {
        self.proto_offsets
            .iter()
            .map(|&off| {
                let cell = self.chunk_addr + off as Word * WORD_SIZE;
                let proto = space.read_word(cell).unwrap_or(0);
                let result = space.read_word(cell + WORD_SIZE).unwrap_or(0);
                (proto, result)
            })
            .collect()
    }

    /// The miss handler. Invoked by generated code with the receiver, the
    /// result the generic lookup produced, and the return address of the
    /// call. Every failure path degrades to doing nothing; the call site
    /// then simply keeps paying for generic lookups.
    pub fn miss<H: Heap, S: CodeSpace>(
        &mut self,
        heap: &mut H,
        space: &mut S,
        object: Word,
        result: Word,
        caller_ip: Word,
    ) {
        if heap.tag_of(object) != HeapTag::Object {
            return;
        }
        let Some(call_site) = self.find_call_site(space, caller_ip) else {
            return;
        };
        let proto = heap.proto_of(object);
        if proto == IC_DISABLED {
            return;
        }

        if self.protos.len() >= Self::MAX_SIZE {
            // Saturated: the call site degrades to the generic stub and the
            // cache retires.
            let stub = space.lookup_property_stub();
            space.write_word(call_site, stub);
            self.release(heap, space);
            return;
        }

        // A collection may have nulled a compare cell; that slot is dead
        // and gets refilled instead of growing the cache.
        match self.dead_slot(space) {
            Some(slot) => {
                self.protos[slot] = proto;
                self.results[slot] = result;
            }
            None => {
                self.protos.push(proto);
                self.results.push(result);
            }
        }

        let addr = self.generate(heap, space);
        space.write_word(call_site, addr);
    }

    /// Drops the current chunk: weak references are dereferenced before the
    /// backing memory goes away. Also the destructor protocol: the owner
    /// calls this before dropping the cache.
    pub fn release<H: Heap, S: CodeSpace>(&mut self, heap: &mut H, space: &mut S) {
        if let Some(chunk) = self.chunk.take() {
            for &off in &self.proto_offsets {
                let slot = self.chunk_addr + off as Word * WORD_SIZE;
                let value = space.read_word(slot).unwrap_or(0);
                heap.dereference(slot, value);
            }
            space.unref(chunk);
            self.chunk_addr = 0;
        }
        self.proto_offsets.clear();
    }

    /// Locates the relocatable target word of the call instruction: the
    /// word in the window preceding the return address that holds this
    /// cache's chunk address.
    fn find_call_site<S: CodeSpace>(&self, space: &S, caller_ip: Word) -> Option<SlotAddr> {
        if self.chunk_addr == 0 {
            return None;
        }
        for back in 1..=PATCH_WINDOW_WORDS {
            let addr = caller_ip.checked_sub(back * WORD_SIZE)?;
            if space.read_word(addr) == Some(self.chunk_addr) {
                return Some(addr);
            }
        }
        None
    }

    fn dead_slot<S: CodeSpace>(&self, space: &S) -> Option<usize> {
        (0..self.protos.len()).find(|&i| {
            let cell = self.chunk_addr + self.proto_offsets[i] as Word * WORD_SIZE;
            space.read_word(cell) == Some(0)
        })
    }

    /// Builds a fresh chunk testing the full prototype list. Weak
    /// references move from the old chunk's cells to the new one's.
    fn generate<H: Heap, S: CodeSpace>(&mut self, heap: &mut H, space: &mut S) -> Word {
        self.release(heap, space);

        let stub = space.lookup_property_stub();
        let mut words = vec![PIC_ENTRY_MARKER, self.protos.len() as Word];
        for i in 0..self.protos.len() {
            self.proto_offsets.push(words.len());
            words.push(self.protos[i]);
            words.push(self.results[i]);
        }
        words.push(stub);

        let chunk = space.create_chunk("__pic__");
        space.put(chunk, words);
        let base = space.addr(chunk);
        for (i, &off) in self.proto_offsets.iter().enumerate() {
            heap.reference(RefKind::Weak, base + off as Word * WORD_SIZE, self.protos[i]);
        }
        self.chunk = Some(chunk);
        self.chunk_addr = base;
        base
    }
}
