use std::fmt;

use crate::cont::{MetaCont, MetaContBase};
use crate::types::TypeKey;

/// Builds an empty container for one payload type.
pub type MakeCont = fn(&str) -> Box<dyn MetaContBase>;

/// Static description of a container factory.
///
/// Type descriptors are carried as function pointers so definitions can be
/// `const` and submitted through `inventory` (see [`crate::metacont_def!`]).
#[derive(Clone, Copy)]
pub struct FactoryDef {
	/// Concrete payload type; always bound.
	pub payload: fn() -> TypeKey,
	/// Transient interface the payload implements; bound only for the
	/// current version.
	pub transient: Option<fn() -> TypeKey>,
	/// False for historical schema versions kept readable.
	pub current: bool,
	pub make: MakeCont,
}

inventory::collect!(FactoryDef);

fn make_cont<T: Send + Sync + 'static>(label: &str) -> Box<dyn MetaContBase> {
	Box::new(MetaCont::<T>::new(label))
}

impl FactoryDef {
	/// Factory for `MetaCont<T>`, current version, no transient key.
	pub const fn of<T: Send + Sync + 'static>() -> Self {
		Self {
			payload: TypeKey::of::<T>,
			transient: None,
			current: true,
			make: make_cont::<T>,
		}
	}

	/// Also binds the key of the transient interface `I` while current.
	pub const fn transient<I: ?Sized + 'static>(mut self) -> Self {
		self.transient = Some(TypeKey::of::<I>);
		self
	}

	/// Marks this payload as a historical version.
	pub const fn old(mut self) -> Self {
		self.current = false;
		self
	}

	/// Keys this definition binds, concrete first.
	pub fn keys(&self) -> (TypeKey, Option<TypeKey>) {
		let transient = match self.transient {
			Some(key) if self.current => Some(key()),
			_ => None,
		};
		((self.payload)(), transient)
	}
}

impl fmt::Debug for FactoryDef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let (payload, transient) = self.keys();
		f.debug_struct("FactoryDef")
			.field("payload", &payload)
			.field("transient", &transient)
			.field("current", &self.current)
			.finish()
	}
}

/// Handle to a bound factory, returned by lookups.
#[derive(Clone, Copy)]
pub struct FactoryRef {
	pub(super) payload: TypeKey,
	pub(super) current: bool,
	pub(super) ordinal: u32,
	pub(super) make: MakeCont,
}

impl FactoryRef {
	/// Payload type of the containers this factory builds.
	pub fn payload(&self) -> TypeKey {
		self.payload
	}

	pub fn is_current(&self) -> bool {
		self.current
	}

	/// Registration order within its registry; distinguishes re-registrations
	/// of the same payload type.
	pub fn ordinal(&self) -> u32 {
		self.ordinal
	}

	/// Builds an empty container under `label`.
	pub fn make(&self, label: &str) -> Box<dyn MetaContBase> {
		(self.make)(label)
	}
}

impl PartialEq for FactoryRef {
	fn eq(&self, other: &Self) -> bool {
		self.payload == other.payload && self.ordinal == other.ordinal
	}
}

impl Eq for FactoryRef {}

impl fmt::Debug for FactoryRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FactoryRef")
			.field("payload", &self.payload)
			.field("current", &self.current)
			.field("ordinal", &self.ordinal)
			.finish()
	}
}
