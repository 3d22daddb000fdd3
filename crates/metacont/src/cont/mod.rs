//! Metadata containers.
//!
//! # Mental Model
//!
//! A [`MetaCont<T>`] maps each [`SourceId`] to at most one payload of type `T`.
//! Producers insert payloads as sources appear; consumers look them up by
//! source or enumerate the sources seen so far. Code that only knows the
//! payload type at runtime talks to the same container through
//! [`MetaContBase`].
//!
//! # Invariants
//!
//! - One payload per source. A second insert is rejected and the payload is
//!   handed back.
//! - Payloads are never removed or replaced, so an observer handle returned
//!   by `find` always points at the value the winning insert stored.
//! - Every payload is dropped exactly once, after the container and the last
//!   observer handle are gone.
//! - All access to the map goes through one readers-writer lock, so readers
//!   see the result of some prefix of completed inserts.

mod typed;

use std::any::Any;
use std::{fmt, io};
use std::sync::Arc;

pub use typed::MetaCont;

use crate::error::{ErasedPayload, InsertError};
use crate::source::SourceId;
use crate::types::{ProxyId, TypeKey};

/// Type-erased view of a [`MetaCont<T>`].
pub trait MetaContBase: Any + Send + Sync {
	/// Descriptor of the payload type held by this container.
	fn data_type(&self) -> TypeKey;

	/// Key this container was created under.
	fn label(&self) -> &str;

	/// Inserts a payload whose static type is unknown to the caller.
	///
	/// The payload is checked against the container's type first. On any
	/// failure it is returned inside the error.
	fn insert_any(&self, sid: SourceId, payload: ErasedPayload) -> Result<(), InsertError>;

	/// Returns true if `sid` holds a payload.
	fn valid(&self, sid: SourceId) -> bool;

	/// Number of sources currently held.
	fn entries(&self) -> usize;

	/// Snapshot of the sources currently held, in [`SourceId`] order.
	fn sources(&self) -> Vec<SourceId>;

	/// Type-erased observer handle for the payload of `sid`.
	fn get_any(&self, sid: SourceId) -> Option<Arc<dyn Any + Send + Sync>>;

	/// Writes a summary listing at most `max_sources` sources.
	fn list_sources(&self, out: &mut dyn io::Write, max_sources: usize) -> io::Result<()>;

	/// Writes a human-readable summary.
	fn list(&self, out: &mut dyn io::Write) -> io::Result<()> {
		self.list_sources(out, usize::MAX)
	}

	fn proxy(&self) -> Option<ProxyId>;

	fn set_proxy(&self, proxy: Option<ProxyId>);

	fn as_any(&self) -> &dyn Any;

	fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl dyn MetaContBase {
	/// Recovers the typed container behind a shared reference.
	pub fn downcast_ref<T: Send + Sync + 'static>(&self) -> Option<&MetaCont<T>> {
		self.as_any().downcast_ref()
	}

	pub fn is_empty(&self) -> bool {
		self.entries() == 0
	}
}

impl fmt::Debug for dyn MetaContBase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MetaContBase")
			.field("label", &self.label())
			.field("data_type", &self.data_type())
			.field("entries", &self.entries())
			.finish()
	}
}

/// Recovers the typed container behind an `Arc`.
pub fn downcast_arc<T: Send + Sync + 'static>(cont: Arc<dyn MetaContBase>) -> Option<Arc<MetaCont<T>>> {
	cont.into_any_arc().downcast().ok()
}

#[cfg(test)]
mod tests;
