//! Registry container with atomic publication.
//!
//! # Invariants
//!
//! - Concurrent registrations are linearizable; none is lost (CAS retry loop).
//! - Readers never block and always see a complete table.

use std::any::TypeId;
use std::sync::Arc;

use arc_swap::ArcSwap;
use rustc_hash::FxHashMap;
use tracing::warn;

use super::collision::{Collision, DuplicatePolicy, KeyKind, Resolution};
use super::def::{FactoryDef, FactoryRef};
use crate::types::TypeKey;

/// Per-key outcome of one [`TypeRegistry::register`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
	pub concrete: Resolution,
	/// `None` when the definition binds no transient key.
	pub transient: Option<Resolution>,
}

#[derive(Clone, Copy)]
struct Binding {
	key: TypeKey,
	factory: FactoryRef,
}

#[derive(Clone, Default)]
struct Table {
	by_type: FxHashMap<TypeId, Binding>,
	by_name: FxHashMap<&'static str, TypeId>,
	collisions: Vec<Collision>,
	next_ordinal: u32,
}

impl Table {
	fn bind(&mut self, key: TypeKey, kind: KeyKind, incoming: FactoryRef, policy: DuplicatePolicy) -> Resolution {
		let Some(existing) = self.by_type.get(&key.id()).copied() else {
			self.by_type.insert(key.id(), Binding { key, factory: incoming });
			self.bind_name(key, incoming, policy);
			return Resolution::InsertedNew;
		};

		let resolution = resolve(policy, kind, key, existing.factory, incoming);
		if resolution == Resolution::ReplacedExisting {
			self.by_type.insert(key.id(), Binding { key, factory: incoming });
		}
		self.collisions.push(Collision {
			key,
			kind,
			existing: existing.factory.payload(),
			incoming: incoming.payload(),
			resolution,
		});
		resolution
	}

	/// Points the type name of a newly bound key at it. Distinct types can
	/// share a name (two versions of one crate in a build); such a clash is
	/// resolved by `policy` like any other.
	fn bind_name(&mut self, key: TypeKey, incoming: FactoryRef, policy: DuplicatePolicy) {
		let Some(&other) = self.by_name.get(key.name()) else {
			self.by_name.insert(key.name(), key.id());
			return;
		};
		let Some(existing) = self.by_type.get(&other).copied() else {
			self.by_name.insert(key.name(), key.id());
			return;
		};

		let resolution = resolve(policy, KeyKind::Name, key, existing.factory, incoming);
		if resolution == Resolution::ReplacedExisting {
			self.by_name.insert(key.name(), key.id());
		}
		self.collisions.push(Collision {
			key,
			kind: KeyKind::Name,
			existing: existing.factory.payload(),
			incoming: incoming.payload(),
			resolution,
		});
	}
}

fn resolve(policy: DuplicatePolicy, kind: KeyKind, key: TypeKey, existing: FactoryRef, incoming: FactoryRef) -> Resolution {
	match policy {
		DuplicatePolicy::FirstWins => Resolution::KeptExisting,
		DuplicatePolicy::LastWins => Resolution::ReplacedExisting,
		DuplicatePolicy::Panic => panic!(
			"duplicate container factory for {kind} key {key}: {} and {}",
			existing.payload(),
			incoming.payload()
		),
	}
}

/// Table mapping payload type descriptors to container factories.
///
/// Lookups load an immutable snapshot and never block; registration builds an
/// extended copy and publishes it with compare-and-swap.
pub struct TypeRegistry {
	snap: ArcSwap<Table>,
	policy: DuplicatePolicy,
}

impl TypeRegistry {
	/// Creates an empty registry using the default [`DuplicatePolicy`].
	pub fn new() -> Self {
		Self::with_policy(DuplicatePolicy::default())
	}

	pub fn with_policy(policy: DuplicatePolicy) -> Self {
		Self {
			snap: ArcSwap::from_pointee(Table::default()),
			policy,
		}
	}

	pub fn policy(&self) -> DuplicatePolicy {
		self.policy
	}

	/// Binds `def` under its concrete key and, for current versions, its
	/// transient key.
	///
	/// # Panics
	///
	/// Under [`DuplicatePolicy::Panic`] when a key is already bound.
	pub fn register(&self, def: &FactoryDef) -> Registration {
		let (payload, transient) = def.keys();

		loop {
			let old = self.snap.load_full();
			let mut next = Table::clone(&old);

			let factory = FactoryRef {
				payload,
				current: def.current,
				ordinal: next.next_ordinal,
				make: def.make,
			};
			next.next_ordinal += 1;
			let seen = next.collisions.len();

			let outcome = Registration {
				concrete: next.bind(payload, KeyKind::Concrete, factory, self.policy),
				transient: transient.map(|key| next.bind(key, KeyKind::Transient, factory, self.policy)),
			};

			let fresh: Vec<Collision> = next.collisions[seen..].to_vec();
			let next = Arc::new(next);
			let prev = self.snap.compare_and_swap(&old, next);

			if Arc::ptr_eq(&prev, &old) {
				for collision in fresh {
					warn!(
						key = %collision.key,
						kind = %collision.kind,
						existing = %collision.existing,
						incoming = %collision.incoming,
						resolution = ?collision.resolution,
						"container factory registered twice"
					);
				}
				return outcome;
			}
			// Lost the race; rebuild on top of the newer table.
		}
	}

	/// Returns the factory bound to `key`.
	pub fn lookup(&self, key: &TypeKey) -> Option<FactoryRef> {
		self.snap.load().by_type.get(&key.id()).map(|b| b.factory)
	}

	/// Returns the factory bound to the type named `name`.
	pub fn lookup_name(&self, name: &str) -> Option<FactoryRef> {
		let snap = self.snap.load();
		let id = snap.by_name.get(name)?;
		snap.by_type.get(id).map(|b| b.factory)
	}

	pub fn lookup_type<T: ?Sized + 'static>(&self) -> Option<FactoryRef> {
		self.lookup(&TypeKey::of::<T>())
	}

	pub fn contains(&self, key: &TypeKey) -> bool {
		self.snap.load().by_type.contains_key(&key.id())
	}

	/// All bound keys, sorted.
	pub fn keys(&self) -> Vec<TypeKey> {
		let mut keys: Vec<TypeKey> = self.snap.load().by_type.values().map(|b| b.key).collect();
		keys.sort_unstable();
		keys
	}

	/// Every conflict seen so far, in registration order.
	pub fn collisions(&self) -> Vec<Collision> {
		self.snap.load().collisions.clone()
	}

	/// Number of bound keys.
	pub fn len(&self) -> usize {
		self.snap.load().by_type.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl Default for TypeRegistry {
	fn default() -> Self {
		Self::new()
	}
}
