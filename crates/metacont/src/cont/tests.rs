use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

use proptest::prelude::*;

use super::{MetaCont, MetaContBase, downcast_arc};
use crate::error::{ErasedPayload, InsertError};
use crate::source::SourceId;
use crate::types::{ProxyId, TypeKey};

fn sid(n: u32) -> SourceId {
	SourceId::new(&format!("src-{n}"))
}

/// Payload that counts how often it is dropped.
#[derive(Debug)]
struct Tracked {
	tag: usize,
	drops: Arc<AtomicUsize>,
}

impl Tracked {
	fn new(tag: usize, drops: &Arc<AtomicUsize>) -> Self {
		Self {
			tag,
			drops: Arc::clone(drops),
		}
	}
}

impl Drop for Tracked {
	fn drop(&mut self) {
		self.drops.fetch_add(1, Ordering::SeqCst);
	}
}

#[test]
fn test_insert_find_and_duplicate() {
	let cont = MetaCont::<i32>::new("EventFormat");

	let stored = cont.insert(sid(1), 42).expect("first insert wins");
	assert_eq!(cont.entries(), 1);
	let found = cont.find(sid(1)).expect("inserted source is found");
	assert!(Arc::ptr_eq(&stored, &found));
	assert_eq!(*found, 42);

	let rejected = cont.insert(sid(1), 7).expect_err("second insert is rejected");
	assert_eq!(rejected.sid, sid(1));
	assert_eq!(rejected.into_payload(), 7);
	assert_eq!(cont.entries(), 1);
	assert_eq!(*cont.find(sid(1)).unwrap(), 42);

	cont.insert(sid(2), 99).expect("new source accepted");
	assert_eq!(cont.entries(), 2);
	assert_eq!(cont.sources(), vec![sid(1), sid(2)]);
}

#[test]
fn test_find_on_empty_container() {
	let cont = MetaCont::<i32>::new("empty");
	assert!(cont.find(sid(999)).is_none());
	assert!(!cont.valid(sid(999)));
	assert!(cont.is_empty());
	assert!(cont.sources().is_empty());
}

/// Dropping a container releases each stored payload exactly once; rejected
/// payloads stay with the caller.
#[test]
fn test_drop_releases_each_payload_once() {
	let drops = Arc::new(AtomicUsize::new(0));
	let cont = MetaCont::new("tracked");

	assert!(cont.insert(sid(1), Tracked::new(42, &drops)).is_ok());
	assert!(cont.insert(sid(2), Tracked::new(99, &drops)).is_ok());
	let rejected = cont.insert(sid(1), Tracked::new(7, &drops)).unwrap_err();
	assert_eq!(drops.load(Ordering::SeqCst), 0);

	drop(rejected);
	assert_eq!(drops.load(Ordering::SeqCst), 1);

	drop(cont);
	assert_eq!(drops.load(Ordering::SeqCst), 3);
}

/// An observer handle keeps its payload alive past the container.
#[test]
fn test_observer_outlives_container() {
	let drops = Arc::new(AtomicUsize::new(0));
	let cont = MetaCont::new("tracked");
	cont.insert(sid(1), Tracked::new(1, &drops)).unwrap();
	let observer = cont.find(sid(1)).unwrap();

	drop(cont);
	assert_eq!(drops.load(Ordering::SeqCst), 0);
	assert_eq!(observer.tag, 1);

	drop(observer);
	assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[test]
fn test_concurrent_same_source_has_one_winner() {
	const THREADS: usize = 8;
	let drops = Arc::new(AtomicUsize::new(0));
	let cont = MetaCont::new("race");
	let barrier = Barrier::new(THREADS);

	let outcomes: Vec<Result<usize, usize>> = std::thread::scope(|s| {
		let handles: Vec<_> = (0..THREADS)
			.map(|tag| {
				let (cont, barrier, drops) = (&cont, &barrier, &drops);
				s.spawn(move || {
					barrier.wait();
					match cont.insert(sid(5), Tracked::new(tag, drops)) {
						Ok(stored) => Ok(stored.tag),
						Err(dup) => Err(dup.into_payload().tag),
					}
				})
			})
			.collect();
		handles.into_iter().map(|h| h.join().unwrap()).collect()
	});

	let winners: Vec<usize> = outcomes.iter().filter_map(|o| o.ok()).collect();
	assert_eq!(winners.len(), 1);
	assert_eq!(cont.entries(), 1);
	assert_eq!(cont.find(sid(5)).unwrap().tag, winners[0]);

	let mut losers: Vec<usize> = outcomes.iter().filter_map(|o| o.err()).collect();
	losers.push(winners[0]);
	losers.sort_unstable();
	assert_eq!(losers, (0..THREADS).collect::<Vec<_>>());
	assert_eq!(drops.load(Ordering::SeqCst), THREADS - 1);

	drop(cont);
	assert_eq!(drops.load(Ordering::SeqCst), THREADS);
}

#[test]
fn test_concurrent_overlapping_sources() {
	const THREADS: u32 = 6;
	let cont = MetaCont::<u32>::new("overlap");
	let barrier = Barrier::new(THREADS as usize);

	let accepted: usize = std::thread::scope(|s| {
		let handles: Vec<_> = (0..THREADS)
			.map(|t| {
				let (cont, barrier) = (&cont, &barrier);
				s.spawn(move || {
					barrier.wait();
					(0..THREADS).filter(|k| cont.insert(sid(*k), t).is_ok()).count()
				})
			})
			.collect();
		handles.into_iter().map(|h| h.join().unwrap()).sum()
	});

	assert_eq!(accepted, THREADS as usize);
	assert_eq!(cont.entries(), THREADS as usize);
}

#[test]
fn test_concurrent_disjoint_sources() {
	const THREADS: u32 = 4;
	const PER_THREAD: u32 = 64;
	let cont = MetaCont::<u32>::new("disjoint");

	std::thread::scope(|s| {
		for t in 0..THREADS {
			let cont = &cont;
			s.spawn(move || {
				for k in 0..PER_THREAD {
					let n = t * PER_THREAD + k;
					assert!(cont.insert(sid(n), n).is_ok());
					assert_eq!(cont.find(sid(n)).as_deref(), Some(&n));
				}
			});
		}
	});

	assert_eq!(cont.entries(), (THREADS * PER_THREAD) as usize);
}

#[test]
fn test_erased_insert_matches_typed_insert() {
	let cont = MetaCont::<String>::new("erased");
	let erased: &dyn MetaContBase = &cont;

	erased
		.insert_any(sid(1), Box::new(String::from("v1")))
		.expect("matching type accepted");
	assert!(erased.valid(sid(1)));
	assert_eq!(erased.entries(), 1);
	assert_eq!(cont.find(sid(1)).as_deref().map(String::as_str), Some("v1"));

	let dup = erased
		.insert_any(sid(1), Box::new(String::from("v2")))
		.unwrap_err();
	assert!(dup.is_duplicate());
	let payload = dup.into_payload().downcast::<String>().unwrap();
	assert_eq!(*payload, "v2");
	assert_eq!(erased.entries(), 1);
}

#[test]
fn test_erased_insert_rejects_wrong_type() {
	let cont = MetaCont::<String>::new("erased");
	let erased: &dyn MetaContBase = &cont;

	let payload: ErasedPayload = Box::new(17_u64);
	let err = erased.insert_any(sid(3), payload).unwrap_err();
	match &err {
		InsertError::TypeMismatch { sid: at, expected, .. } => {
			assert_eq!(*at, sid(3));
			assert_eq!(*expected, TypeKey::of::<String>());
		}
		other => panic!("unexpected error: {other:?}"),
	}
	assert_eq!(*err.into_payload().downcast::<u64>().unwrap(), 17);
	assert_eq!(erased.entries(), 0);
	assert!(!erased.valid(sid(3)));
}

#[test]
fn test_erased_debug_names_label_and_type() {
	let cont: Arc<dyn MetaContBase> = Arc::new(MetaCont::<u16>::new("RunNumbers"));
	cont.insert_any(sid(1), Box::new(7_u16)).unwrap();

	let text = format!("{cont:?}");
	assert!(text.starts_with("MetaContBase"));
	assert!(text.contains("\"RunNumbers\""));
	assert!(text.contains("u16"));
	assert!(text.contains("entries: 1"));
}

#[test]
fn test_get_any_and_downcasts() {
	let cont: Arc<dyn MetaContBase> = Arc::new(MetaCont::<f64>::new("lumi"));
	assert_eq!(cont.data_type(), TypeKey::of::<f64>());
	cont.insert_any(sid(1), Box::new(2.5_f64)).unwrap();

	let any = cont.get_any(sid(1)).unwrap();
	assert_eq!(any.downcast_ref::<f64>(), Some(&2.5));
	assert!(cont.get_any(sid(2)).is_none());

	assert!(cont.downcast_ref::<f64>().is_some());
	assert!(cont.downcast_ref::<f32>().is_none());

	assert!(downcast_arc::<f32>(Arc::clone(&cont)).is_none());
	let typed = downcast_arc::<f64>(cont).expect("typed container");
	assert_eq!(typed.label(), "lumi");
	assert_eq!(*typed.find(sid(1)).unwrap(), 2.5);
}

#[test]
fn test_proxy_is_stored_not_owned() {
	let proxy = ProxyId::next();
	let cont = MetaCont::<u8>::with_proxy("proxied", proxy);
	assert_eq!(cont.proxy(), Some(proxy));

	let erased: &dyn MetaContBase = &cont;
	erased.set_proxy(None);
	assert_eq!(erased.proxy(), None);

	let other = ProxyId::next();
	assert_ne!(proxy, other);
	erased.set_proxy(Some(other));
	assert_eq!(cont.proxy(), Some(other));
}

#[test]
fn test_list_summary() {
	let cont = MetaCont::<u8>::new("TriggerMenu");
	for n in [3, 1, 2] {
		cont.insert(sid(n), n as u8).unwrap();
	}

	let mut out = Vec::new();
	cont.list_sources(&mut out, 2).unwrap();
	let text = String::from_utf8(out).unwrap();
	let lines: Vec<&str> = text.lines().collect();
	assert_eq!(lines[0], "MetaCont<u8> \"TriggerMenu\" entries=3 proxy=none");
	assert_eq!(&lines[1..], ["  src-1", "  src-2", "  ... 1 more"]);

	let mut full = Vec::new();
	cont.list(&mut full).unwrap();
	assert_eq!(String::from_utf8(full).unwrap().lines().count(), 4);
}

proptest! {
	/// Entries equal the number of distinct keys, the first insert per key
	/// wins and lookups return exactly the winning payload.
	#[test]
	fn prop_first_insert_per_source_wins(ops in prop::collection::vec((0u32..8, any::<i64>()), 0..64)) {
		let cont = MetaCont::<i64>::new("prop");
		let mut model: BTreeMap<u32, i64> = BTreeMap::new();

		for (key, value) in ops {
			let accepted = cont.insert(sid(key), value).is_ok();
			let expected = !model.contains_key(&key);
			prop_assert_eq!(accepted, expected);
			model.entry(key).or_insert(value);
		}

		prop_assert_eq!(cont.entries(), model.len());
		for key in 0..8 {
			prop_assert_eq!(cont.find(sid(key)).map(|v| *v), model.get(&key).copied());
		}
	}
}
