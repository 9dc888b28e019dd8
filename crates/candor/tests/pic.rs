//! Inline-cache behavior: growth in observation order, saturation to the
//! generic stub, weak-reference cooperation with the collector, and the
//! sentinel for cache-disabled objects.

use std::collections::HashMap;

use candor::{
    CodeSpace, HeapTag, IC_DISABLED, MemoryCodeSpace, Pic, RefKind, Word,
    code::WORD_SIZE,
    heap::{Heap, SlotAddr},
    pic::PIC_ENTRY_MARKER,
};

/// Scriptable heap: object tags and prototypes are seeded by the test;
/// weak-reference registrations are recorded so a collection can null the
/// cells they point at.
#[derive(Default)]
struct TestHeap {
    tags: HashMap<Word, HeapTag>,
    protos: HashMap<Word, Word>,
    weak_slots: Vec<(SlotAddr, Word)>,
}

impl TestHeap {
    fn add_object(&mut self, object: Word, proto: Word) {
        self.tags.insert(object, HeapTag::Object);
        self.protos.insert(object, proto);
    }

    fn add_smi(&mut self, value: Word) {
        self.tags.insert(value, HeapTag::Smi);
    }

    /// Simulates a collection that frees `dead_proto`: every registered
    /// weak slot holding it is nulled in place.
    fn collect(&mut self, dead_proto: Word, space: &mut MemoryCodeSpace) {
        for (slot, value) in &mut self.weak_slots {
            if *value == dead_proto {
                assert!(space.write_word(*slot, 0), "weak slot must stay mapped");
                *value = 0;
            }
        }
    }
}

impl Heap for TestHeap {
    fn reference(&mut self, kind: RefKind, slot: SlotAddr, value: Word) {
        assert_eq!(kind, RefKind::Weak, "the cache registers weak references");
        self.weak_slots.push((slot, value));
    }

    fn dereference(&mut self, slot: SlotAddr, _value: Word) {
        self.weak_slots.retain(|&(s, _)| s != slot);
    }

    fn tag_of(&self, value: Word) -> HeapTag {
        self.tags.get(&value).copied().unwrap_or(HeapTag::Nil)
    }

    fn proto_of(&self, object: Word) -> Word {
        self.protos.get(&object).copied().unwrap_or(0)
    }
}

/// One compiled property-access site: a caller chunk whose first word is
/// the patchable call target, with the return address right after it.
struct CallSite {
    cell: Word,
    caller_ip: Word,
}

impl CallSite {
    fn new(space: &mut MemoryCodeSpace, target: Word) -> Self {
        let caller = space.create_chunk("caller");
        space.put(caller, vec![target, 0]);
        let cell = space.addr(caller);
        Self {
            cell,
            caller_ip: cell + WORD_SIZE,
        }
    }

    fn target(&self, space: &MemoryCodeSpace) -> Word {
        space.read_word(self.cell).expect("call site is mapped")
    }
}

enum Outcome {
    Hit(Word),
    Miss,
    Generic,
}

/// Walks the cache's compare table the way the generated code does: check
/// the receiver tag, load the prototype, compare each cached prototype in
/// order, fall through to the miss path.
fn run_site(space: &MemoryCodeSpace, heap: &TestHeap, site: &CallSite, object: Word) -> Outcome {
    let target = site.target(space);
    if target == space.lookup_property_stub() {
        return Outcome::Generic;
    }
    assert_eq!(space.read_word(target), Some(PIC_ENTRY_MARKER));
    if heap.tag_of(object) != HeapTag::Object {
        return Outcome::Miss;
    }
    let proto = heap.proto_of(object);
    let count = space.read_word(target + WORD_SIZE).expect("entry count");
    for i in 0..count {
        let cell = target + (2 + 2 * i) * WORD_SIZE;
        if space.read_word(cell) == Some(proto) {
            let result = space.read_word(cell + WORD_SIZE).expect("result word");
            return Outcome::Hit(result);
        }
    }
    Outcome::Miss
}

/// Drives one access: hit returns the cached value, miss invokes the miss
/// handler the way the generated code's tail call does.
fn access(
    pic: &mut Pic,
    space: &mut MemoryCodeSpace,
    heap: &mut TestHeap,
    site: &CallSite,
    object: Word,
    generic_result: Word,
) -> Word {
    match run_site(space, heap, site, object) {
        Outcome::Hit(result) => result,
        Outcome::Generic => generic_result,
        Outcome::Miss => {
            pic.miss(heap, space, object, generic_result, site.caller_ip);
            generic_result
        }
    }
}

const PROTO_BASE: Word = 0xA000;
const OBJ_BASE: Word = 0xB000;

fn object_with_proto(heap: &mut TestHeap, n: Word) -> Word {
    let object = OBJ_BASE + n;
    heap.add_object(object, PROTO_BASE + n);
    object
}

#[test]
fn cache_grows_in_observation_order() {
    let mut space = MemoryCodeSpace::new();
    let mut heap = TestHeap::default();
    let mut pic = Pic::new();
    let site = CallSite::new(&mut space, 0);
    let initial = pic.install(&mut space);
    assert!(space.write_word(site.cell, initial));

    for k in 0..Pic::MAX_SIZE as Word {
        let object = object_with_proto(&mut heap, k);
        let value = access(&mut pic, &mut space, &mut heap, &site, object, 100 + k);
        assert_eq!(value, 100 + k);
        assert_eq!(pic.size(), k as usize + 1);

        // The call site now points at a chunk testing exactly the observed
        // prototypes, in observation order.
        assert_eq!(site.target(&space), pic.chunk_addr());
        let cached = pic.cached(&space);
        let expected: Vec<(Word, Word)> =
            (0..=k).map(|i| (PROTO_BASE + i, 100 + i)).collect();
        assert_eq!(cached, expected);

        // And a repeat access is a hit, without growing the cache.
        let repeat = access(&mut pic, &mut space, &mut heap, &site, object, 999);
        assert_eq!(repeat, 100 + k);
        assert_eq!(pic.size(), k as usize + 1);
    }
}

#[test]
fn saturation_patches_in_the_generic_stub() {
    let mut space = MemoryCodeSpace::new();
    let mut heap = TestHeap::default();
    let mut pic = Pic::new();
    let site = CallSite::new(&mut space, 0);
    let initial = pic.install(&mut space);
    assert!(space.write_word(site.cell, initial));

    for k in 0..=Pic::MAX_SIZE as Word {
        let object = object_with_proto(&mut heap, k);
        access(&mut pic, &mut space, &mut heap, &site, object, k);
    }

    assert_eq!(site.target(&space), space.lookup_property_stub());
    assert_eq!(pic.chunk_addr(), 0, "a retired cache has no chunk");
    assert!(
        heap.weak_slots.is_empty(),
        "retiring dereferences every weak slot"
    );

    // Further accesses stay on the generic path and never mutate the site.
    let object = object_with_proto(&mut heap, 77);
    let value = access(&mut pic, &mut space, &mut heap, &site, object, 123);
    assert_eq!(value, 123);
    assert_eq!(site.target(&space), space.lookup_property_stub());
}

#[test]
fn collected_prototypes_miss_and_refill_in_place() {
    let mut space = MemoryCodeSpace::new();
    let mut heap = TestHeap::default();
    let mut pic = Pic::new();
    let site = CallSite::new(&mut space, 0);
    let initial = pic.install(&mut space);
    assert!(space.write_word(site.cell, initial));

    for k in 0..3 {
        let object = object_with_proto(&mut heap, k);
        access(&mut pic, &mut space, &mut heap, &site, object, 100 + k);
    }

    // The collector frees prototype 1; its compare cell goes null, so the
    // next access with that prototype misses.
    heap.collect(PROTO_BASE + 1, &mut space);
    assert_eq!(pic.cached(&space)[1].0, 0);
    let object = OBJ_BASE + 1;
    assert!(matches!(run_site(&space, &heap, &site, object), Outcome::Miss));

    // The miss refills the dead slot instead of growing the cache.
    let value = access(&mut pic, &mut space, &mut heap, &site, object, 500);
    assert_eq!(value, 500);
    assert_eq!(pic.size(), 3);
    assert_eq!(pic.cached(&space)[1], (PROTO_BASE + 1, 500));
    let hit = access(&mut pic, &mut space, &mut heap, &site, object, 999);
    assert_eq!(hit, 500);
}

#[test]
fn ic_disabled_objects_are_never_cached() {
    let mut space = MemoryCodeSpace::new();
    let mut heap = TestHeap::default();
    let mut pic = Pic::new();
    let site = CallSite::new(&mut space, 0);
    let initial = pic.install(&mut space);
    assert!(space.write_word(site.cell, initial));

    let object = 0xB100;
    heap.add_object(object, IC_DISABLED);
    access(&mut pic, &mut space, &mut heap, &site, object, 1);
    assert_eq!(pic.size(), 0);
    assert_eq!(site.target(&space), initial, "the call site stays untouched");
}

#[test]
fn non_objects_never_mutate_the_cache() {
    let mut space = MemoryCodeSpace::new();
    let mut heap = TestHeap::default();
    let mut pic = Pic::new();
    let site = CallSite::new(&mut space, 0);
    let initial = pic.install(&mut space);
    assert!(space.write_word(site.cell, initial));

    heap.add_smi(42);
    access(&mut pic, &mut space, &mut heap, &site, 42, 7);
    assert_eq!(pic.size(), 0);
    assert_eq!(site.target(&space), initial);
}

#[test]
fn miss_without_a_locatable_call_site_is_a_no_op() {
    let mut space = MemoryCodeSpace::new();
    let mut heap = TestHeap::default();
    let mut pic = Pic::new();
    pic.install(&mut space);

    let object = object_with_proto(&mut heap, 1);
    // An ip pointing nowhere near a cell holding the chunk address.
    pic.miss(&mut heap, &mut space, object, 5, 0x40);
    assert_eq!(pic.size(), 0);
}

#[test]
fn regeneration_moves_weak_references_to_the_new_chunk() {
    let mut space = MemoryCodeSpace::new();
    let mut heap = TestHeap::default();
    let mut pic = Pic::new();
    let site = CallSite::new(&mut space, 0);
    let initial = pic.install(&mut space);
    assert!(space.write_word(site.cell, initial));

    for k in 0..3 {
        let object = object_with_proto(&mut heap, k);
        access(&mut pic, &mut space, &mut heap, &site, object, k);
    }

    // Exactly one weak slot per cached prototype, all inside the current
    // chunk; nothing left behind from superseded chunks.
    assert_eq!(heap.weak_slots.len(), 3);
    for (slot, value) in &heap.weak_slots {
        assert!(*slot >= pic.chunk_addr());
        assert!(*slot < pic.chunk_addr() + 16 * WORD_SIZE);
        assert_ne!(*value, 0);
        assert_eq!(space.read_word(*slot), Some(*value));
    }

    // Superseded chunks are unreferenced: the caller chunk plus the live
    // cache chunk remain.
    assert_eq!(space.live_chunks(), 2);
}

#[test]
fn release_drops_the_chunk_and_the_weak_slots() {
    let mut space = MemoryCodeSpace::new();
    let mut heap = TestHeap::default();
    let mut pic = Pic::new();
    let site = CallSite::new(&mut space, 0);
    let initial = pic.install(&mut space);
    assert!(space.write_word(site.cell, initial));

    let object = object_with_proto(&mut heap, 0);
    access(&mut pic, &mut space, &mut heap, &site, object, 1);
    assert_eq!(pic.size(), 1);

    pic.release(&mut heap, &mut space);
    assert!(heap.weak_slots.is_empty());
    assert_eq!(space.live_chunks(), 1, "only the caller chunk survives");
}
