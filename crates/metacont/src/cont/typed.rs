use std::any::Any;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::{debug, warn};

use super::MetaContBase;
use crate::error::{Duplicate, ErasedPayload, InsertError};
use crate::source::SourceId;
use crate::types::{ProxyId, TypeKey};

/// Container holding at most one payload of type `T` per [`SourceId`].
///
/// Thread-safe; share it across workers via `Arc<MetaCont<T>>`.
pub struct MetaCont<T> {
	label: String,
	payloads: RwLock<BTreeMap<SourceId, Arc<T>>>,
	/// Raw [`ProxyId`], zero when unset.
	proxy: AtomicU64,
}

impl<T: Send + Sync + 'static> MetaCont<T> {
	/// Creates an empty container.
	pub fn new(label: impl Into<String>) -> Self {
		Self {
			label: label.into(),
			payloads: RwLock::new(BTreeMap::new()),
			proxy: AtomicU64::new(0),
		}
	}

	/// Creates an empty container already linked to `proxy`.
	pub fn with_proxy(label: impl Into<String>, proxy: ProxyId) -> Self {
		let cont = Self::new(label);
		cont.proxy.store(proxy.get(), Ordering::Release);
		cont
	}

	/// Stores `payload` for `sid`.
	///
	/// Returns an observer handle to the stored payload, or hands the payload
	/// back if `sid` is already taken. Concurrent inserts on the same source
	/// have exactly one winner.
	pub fn insert(&self, sid: SourceId, payload: T) -> Result<Arc<T>, Duplicate<T>> {
		self.insert_arc(sid, payload, Arc::new)
	}

	/// Like [`MetaCont::insert`] for payloads that are already boxed.
	pub fn insert_boxed(&self, sid: SourceId, payload: Box<T>) -> Result<Arc<T>, Duplicate<Box<T>>> {
		self.insert_arc(sid, payload, Arc::from)
	}

	fn insert_arc<P>(&self, sid: SourceId, payload: P, wrap: impl FnOnce(P) -> Arc<T>) -> Result<Arc<T>, Duplicate<P>> {
		{
			let mut payloads = self.payloads.write();
			if let Entry::Vacant(slot) = payloads.entry(sid) {
				return Ok(Arc::clone(slot.insert(wrap(payload))));
			}
		}
		debug!(container = %self.label, %sid, "duplicate source rejected");
		Err(Duplicate { sid, payload })
	}

	/// Returns an observer handle to the payload of `sid`.
	pub fn find(&self, sid: SourceId) -> Option<Arc<T>> {
		self.payloads.read().get(&sid).cloned()
	}

	/// Alias for [`MetaCont::find`].
	#[inline]
	pub fn get(&self, sid: SourceId) -> Option<Arc<T>> {
		self.find(sid)
	}

	pub fn contains(&self, sid: SourceId) -> bool {
		self.payloads.read().contains_key(&sid)
	}

	pub fn len(&self) -> usize {
		self.payloads.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.payloads.read().is_empty()
	}

	/// Snapshot of every (source, payload) pair, in source order.
	pub fn snapshot(&self) -> Vec<(SourceId, Arc<T>)> {
		self.payloads
			.read()
			.iter()
			.map(|(sid, payload)| (*sid, Arc::clone(payload)))
			.collect()
	}

	pub fn label(&self) -> &str {
		&self.label
	}

	pub fn proxy(&self) -> Option<ProxyId> {
		ProxyId::from_raw(self.proxy.load(Ordering::Acquire))
	}
}

impl<T: Send + Sync + 'static> MetaContBase for MetaCont<T> {
	fn data_type(&self) -> TypeKey {
		TypeKey::of::<T>()
	}

	fn label(&self) -> &str {
		&self.label
	}

	fn insert_any(&self, sid: SourceId, payload: ErasedPayload) -> Result<(), InsertError> {
		let payload = match payload.downcast::<T>() {
			Ok(payload) => payload,
			Err(payload) => {
				warn!(
					container = %self.label,
					%sid,
					expected = TypeKey::of::<T>().name(),
					"payload type mismatch"
				);
				return Err(InsertError::TypeMismatch {
					sid,
					expected: TypeKey::of::<T>(),
					payload,
				});
			}
		};
		match self.insert_boxed(sid, payload) {
			Ok(_) => Ok(()),
			Err(dup) => Err(InsertError::Duplicate {
				sid,
				payload: dup.payload,
			}),
		}
	}

	fn valid(&self, sid: SourceId) -> bool {
		self.contains(sid)
	}

	fn entries(&self) -> usize {
		self.len()
	}

	fn sources(&self) -> Vec<SourceId> {
		self.payloads.read().keys().copied().collect()
	}

	fn get_any(&self, sid: SourceId) -> Option<Arc<dyn Any + Send + Sync>> {
		self.find(sid).map(|payload| payload as Arc<dyn Any + Send + Sync>)
	}

	fn list_sources(&self, out: &mut dyn io::Write, max_sources: usize) -> io::Result<()> {
		// Copy out first so the lock is not held across writer I/O.
		let sources = self.sources();
		let proxy = match self.proxy() {
			Some(proxy) => proxy.to_string(),
			None => "none".to_owned(),
		};
		writeln!(
			out,
			"MetaCont<{}> {:?} entries={} proxy={}",
			TypeKey::of::<T>(),
			self.label,
			sources.len(),
			proxy
		)?;
		for sid in sources.iter().take(max_sources) {
			writeln!(out, "  {sid}")?;
		}
		if sources.len() > max_sources {
			writeln!(out, "  ... {} more", sources.len() - max_sources)?;
		}
		Ok(())
	}

	fn proxy(&self) -> Option<ProxyId> {
		MetaCont::proxy(self)
	}

	fn set_proxy(&self, proxy: Option<ProxyId>) {
		self.proxy.store(proxy.map_or(0, ProxyId::get), Ordering::Release);
	}

	fn as_any(&self) -> &dyn Any {
		self
	}

	fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
		self
	}
}

impl<T> std::fmt::Debug for MetaCont<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MetaCont")
			.field("label", &self.label)
			.field("payload", &std::any::type_name::<T>())
			.field("entries", &self.payloads.read().len())
			.finish()
	}
}
