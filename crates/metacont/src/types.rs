use std::any::TypeId;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

/// Descriptor for a payload type (or a transient interface it implements).
///
/// Identity is the [`TypeId`]; the name is kept for diagnostics and for
/// lookups from code that only has the type name at hand.
#[derive(Clone, Copy)]
pub struct TypeKey {
	id: TypeId,
	name: &'static str,
}

impl TypeKey {
	/// Returns the descriptor for `T`. Works for `dyn Trait` as well.
	pub fn of<T: ?Sized + 'static>() -> Self {
		Self {
			id: TypeId::of::<T>(),
			name: std::any::type_name::<T>(),
		}
	}

	pub fn id(self) -> TypeId {
		self.id
	}

	pub fn name(self) -> &'static str {
		self.name
	}

	/// Same identity under another name.
	#[cfg(test)]
	pub(crate) const fn renamed(self, name: &'static str) -> Self {
		Self { id: self.id, name }
	}

	/// Returns true if this descriptor names `T`.
	pub fn is<T: ?Sized + 'static>(self) -> bool {
		self.id == TypeId::of::<T>()
	}
}

impl PartialEq for TypeKey {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id
	}
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.id.hash(state);
	}
}

impl PartialOrd for TypeKey {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for TypeKey {
	fn cmp(&self, other: &Self) -> Ordering {
		self.name.cmp(other.name).then_with(|| self.id.cmp(&other.id))
	}
}

impl fmt::Display for TypeKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name)
	}
}

impl fmt::Debug for TypeKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("TypeKey").field(&self.name).finish()
	}
}

static NEXT_PROXY: AtomicU64 = AtomicU64::new(1);

/// Non-owning back-reference to whatever store or locator registered a
/// container. Containers only store and return it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProxyId(NonZeroU64);

impl ProxyId {
	/// Allocates a process-unique proxy id.
	pub fn next() -> Self {
		let raw = NEXT_PROXY.fetch_add(1, AtomicOrdering::Relaxed);
		Self(NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN))
	}

	pub const fn from_raw(raw: u64) -> Option<Self> {
		match NonZeroU64::new(raw) {
			Some(id) => Some(Self(id)),
			None => None,
		}
	}

	pub const fn get(self) -> u64 {
		self.0.get()
	}
}

impl fmt::Display for ProxyId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "proxy#{}", self.0)
	}
}
