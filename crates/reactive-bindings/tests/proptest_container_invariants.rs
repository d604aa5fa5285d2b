//! Property-based invariant tests for the observable containers and
//! properties.
//!
//! 1. Dictionary fire count equals the number of content-changing calls.
//! 2. Set fire count equals the number of calls whose delta was non-empty.
//! 3. Set contents match a plain `HashSet` model after any operation
//!    sequence.
//! 4. Detached observable elements never reach the container again.
//! 5. Stored property: write then read returns the value; fires iff changed.
//! 6. Computed: one recomputation per upstream fire; fires iff changed.
//! 7. `union_with(B)` implies `is_superset_of(B)`.

use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use proptest::prelude::*;
use reactive_bindings::{
    Computed, Observable, ObservableDictionary, ObservableHashSet, Property, PropertyExt, Trigger,
};

// ── Helpers ─────────────────────────────────────────────────────────────

fn fire_counter(observable: &impl Observable) -> Rc<Cell<usize>> {
    let hits = Rc::new(Cell::new(0usize));
    let h = Rc::clone(&hits);
    observable.on_updated(move || h.set(h.get() + 1));
    hits
}

#[derive(Debug, Clone)]
enum DictOp {
    Set(u8, i16),
    Remove(u8),
    Clear,
}

fn dict_op_strategy() -> impl Strategy<Value = DictOp> {
    prop_oneof![
        4 => (0u8..8, any::<i16>()).prop_map(|(k, v)| DictOp::Set(k, v)),
        3 => (0u8..8).prop_map(DictOp::Remove),
        1 => Just(DictOp::Clear),
    ]
}

#[derive(Debug, Clone)]
enum SetOp {
    Insert(u8),
    Remove(u8),
    RemoveWhere(u8),
    Union(Vec<u8>),
    Intersect(Vec<u8>),
    Except(Vec<u8>),
    SymmetricExcept(Vec<u8>),
    Clear,
}

fn small_vec() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(0u8..16, 0..6)
}

fn set_op_strategy() -> impl Strategy<Value = SetOp> {
    prop_oneof![
        (0u8..16).prop_map(SetOp::Insert),
        (0u8..16).prop_map(SetOp::Remove),
        (2u8..5).prop_map(SetOp::RemoveWhere),
        small_vec().prop_map(SetOp::Union),
        small_vec().prop_map(SetOp::Intersect),
        small_vec().prop_map(SetOp::Except),
        small_vec().prop_map(SetOp::SymmetricExcept),
        Just(SetOp::Clear),
    ]
}

/// Apply `op` to the model and report whether membership changed.
fn apply_to_model(model: &mut HashSet<u8>, op: &SetOp) -> bool {
    let before = model.clone();
    match op {
        SetOp::Insert(v) => {
            model.insert(*v);
        }
        SetOp::Remove(v) => {
            model.remove(v);
        }
        SetOp::RemoveWhere(m) => model.retain(|v| v % m != 0),
        SetOp::Union(other) => model.extend(other.iter().copied()),
        SetOp::Intersect(other) => {
            let other: HashSet<u8> = other.iter().copied().collect();
            model.retain(|v| other.contains(v));
        }
        SetOp::Except(other) => {
            for v in other {
                model.remove(v);
            }
        }
        SetOp::SymmetricExcept(other) => {
            let other: HashSet<u8> = other.iter().copied().collect();
            *model = model.symmetric_difference(&other).copied().collect();
        }
        SetOp::Clear => model.clear(),
    }
    before != *model
}

fn apply_to_set(set: &ObservableHashSet<u8>, op: &SetOp) {
    match op {
        SetOp::Insert(v) => {
            set.insert(*v);
        }
        SetOp::Remove(v) => {
            set.remove(v);
        }
        SetOp::RemoveWhere(m) => {
            set.remove_where(|v| v % m == 0);
        }
        SetOp::Union(other) => {
            set.union_with(other.iter().copied());
        }
        SetOp::Intersect(other) => {
            set.intersect_with(other.iter().copied());
        }
        SetOp::Except(other) => {
            set.except_with(other.iter().copied());
        }
        SetOp::SymmetricExcept(other) => {
            set.symmetric_except_with(other.iter().copied());
        }
        SetOp::Clear => set.clear(),
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Dictionary fire count
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn dictionary_fires_once_per_changing_call(
        ops in proptest::collection::vec(dict_op_strategy(), 0..60),
    ) {
        let dict: ObservableDictionary<u8, i16> = ObservableDictionary::new();
        let hits = fire_counter(&dict);
        let mut model: HashMap<u8, i16> = HashMap::new();
        let mut expected = 0usize;

        for op in &ops {
            match op {
                DictOp::Set(k, v) => {
                    dict.set(*k, *v);
                    model.insert(*k, *v);
                    expected += 1;
                }
                DictOp::Remove(k) => {
                    let removed = dict.remove(k);
                    prop_assert_eq!(removed, model.remove(k).is_some());
                    expected += usize::from(removed);
                }
                DictOp::Clear => {
                    expected += usize::from(!model.is_empty());
                    dict.clear();
                    model.clear();
                }
            }
            prop_assert_eq!(hits.get(), expected, "after {:?}", op);
        }

        prop_assert_eq!(dict.len(), model.len());
        for (k, v) in &model {
            prop_assert_eq!(dict.get(k), Some(*v));
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2–3. Set fire count and contents
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn set_matches_model_and_fires_on_delta(
        initial in proptest::collection::hash_set(0u8..16, 0..10),
        ops in proptest::collection::vec(set_op_strategy(), 0..40),
    ) {
        let set: ObservableHashSet<u8> = initial.iter().copied().collect();
        let hits = fire_counter(&set);
        let mut model = initial;
        let mut expected = 0usize;

        for op in &ops {
            expected += usize::from(apply_to_model(&mut model, op));
            apply_to_set(&set, op);
            prop_assert_eq!(hits.get(), expected, "after {:?}", op);
            prop_assert!(set.set_equals(model.iter().copied()));
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Detached observable elements stay detached
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn detached_elements_never_reach_container(
        keep in proptest::collection::vec(any::<bool>(), 1..12),
    ) {
        let triggers: Vec<Trigger> = keep.iter().map(|_| Trigger::new()).collect();
        let set: ObservableHashSet<Trigger> = triggers.iter().cloned().collect();
        let dict: ObservableDictionary<usize, Trigger> =
            triggers.iter().cloned().enumerate().collect();

        let removed: Vec<Trigger> = triggers
            .iter()
            .zip(&keep)
            .filter(|(_, keep)| !**keep)
            .map(|(t, _)| t.clone())
            .collect();
        set.except_with(removed.iter().cloned());
        for (i, keep) in keep.iter().enumerate() {
            if !keep {
                dict.remove(&i);
            }
        }

        let set_hits = fire_counter(&set);
        let dict_hits = fire_counter(&dict);
        for trigger in &removed {
            trigger.update();
            prop_assert_eq!(trigger.updated().subscriber_count(), 0);
        }
        prop_assert_eq!(set_hits.get(), 0);
        prop_assert_eq!(dict_hits.get(), 0);

        let kept = keep.iter().filter(|k| **k).count();
        for (trigger, keep) in triggers.iter().zip(&keep) {
            if *keep {
                trigger.update();
            }
        }
        prop_assert_eq!(set_hits.get(), kept);
        prop_assert_eq!(dict_hits.get(), kept);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Stored property
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn property_write_read_and_dedup(
        initial in any::<i32>(),
        writes in proptest::collection::vec(-3i32..3, 0..40),
    ) {
        let p = Property::new(initial);
        let hits = fire_counter(&p);
        let mut current = initial;
        let mut expected = 0usize;

        for w in writes {
            expected += usize::from(w != current);
            current = w;
            p.set(w);
            prop_assert_eq!(p.get(), w);
            prop_assert_eq!(hits.get(), expected);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. Computed recomputation and firing
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn computed_recomputes_once_per_fire(
        values in proptest::collection::vec(0u8..6, 0..30),
    ) {
        let source = Property::new(0u8);
        let calls = Rc::new(Cell::new(0usize));
        let (s, c) = (source.clone(), Rc::clone(&calls));
        let bucket = Computed::new(
            move || {
                c.set(c.get() + 1);
                s.get() / 2
            },
            &[&source],
        );
        let hits = fire_counter(&bucket);

        let mut source_fires = 0usize;
        let mut bucket_fires = 0usize;
        let mut last_source = 0u8;
        let mut last_bucket = 0u8;
        for v in values {
            if v != last_source {
                source_fires += 1;
                last_source = v;
                if v / 2 != last_bucket {
                    bucket_fires += 1;
                    last_bucket = v / 2;
                }
            }
            source.set(v);
            prop_assert_eq!(calls.get(), 1 + source_fires);
            prop_assert_eq!(hits.get(), bucket_fires);
            prop_assert_eq!(bucket.get(), v / 2);
        }
    }
}

proptest! {
    #[test]
    fn map_chain_tracks_root(
        values in proptest::collection::vec(any::<i16>(), 1..20),
        depth in 1usize..6,
    ) {
        let root = Property::new(0i64);
        let mut chain = vec![root.map(|v| v + 1)];
        for _ in 1..depth {
            let next = chain.last().map(|c| c.map(|v| v + 1));
            if let Some(next) = next {
                chain.push(next);
            }
        }
        for v in values {
            root.set(i64::from(v));
            let tail = chain.last().map(Computed::get);
            prop_assert_eq!(tail, Some(i64::from(v) + depth as i64));
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 7. Union implies superset
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn union_implies_superset(
        a in proptest::collection::vec(any::<u8>(), 0..20),
        b in proptest::collection::vec(any::<u8>(), 0..20),
    ) {
        let set: ObservableHashSet<u8> = a.into_iter().collect();
        set.union_with(b.iter().copied());
        prop_assert!(set.is_superset_of(b.iter().copied()));
        prop_assert!(set.overlaps(b.iter().copied()) || b.is_empty());
    }
}
