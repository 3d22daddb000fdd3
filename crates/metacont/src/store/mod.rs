//! Heterogeneous store of metadata containers.
//!
//! A [`MetaStore`] owns containers of many payload types under one erased
//! type, keyed by label. It acts as the proxy for every container it holds:
//! each one is linked back to the store's [`ProxyId`].

use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::config::Config;
use crate::cont::{MetaCont, MetaContBase, downcast_arc};
use crate::error::StoreError;
use crate::registry::{self, TypeRegistry};
use crate::types::{ProxyId, TypeKey};

pub struct MetaStore {
	proxy: ProxyId,
	conts: RwLock<BTreeMap<String, Arc<dyn MetaContBase>>>,
	max_sources: usize,
}

impl MetaStore {
	pub fn new() -> Self {
		Self::with_config(&Config::default())
	}

	pub fn with_config(config: &Config) -> Self {
		Self {
			proxy: ProxyId::next(),
			conts: RwLock::new(BTreeMap::new()),
			max_sources: config.max_sources(),
		}
	}

	/// Proxy id handed to every container recorded here.
	pub fn proxy(&self) -> ProxyId {
		self.proxy
	}

	/// Returns the `MetaCont<T>` under `label`, creating it if absent.
	pub fn record<T: Send + Sync + 'static>(&self, label: &str) -> Result<Arc<MetaCont<T>>, StoreError> {
		if let Some(existing) = self.conts.read().get(label) {
			return typed(label, Arc::clone(existing));
		}
		let cont = {
			let mut conts = self.conts.write();
			let slot = conts.entry(label.to_owned()).or_insert_with(|| {
				debug!(label, payload = std::any::type_name::<T>(), "recording container");
				Arc::new(MetaCont::<T>::with_proxy(label, self.proxy))
			});
			Arc::clone(slot)
		};
		typed(label, cont)
	}

	/// Like [`MetaStore::record`] for a payload type only known at runtime,
	/// resolved through the process-wide registry.
	pub fn record_dyn(&self, payload: &TypeKey, label: &str) -> Result<Arc<dyn MetaContBase>, StoreError> {
		self.record_dyn_with(registry::global(), payload, label)
	}

	/// Like [`MetaStore::record_dyn`] against an explicit registry.
	pub fn record_dyn_with(
		&self,
		registry: &TypeRegistry,
		payload: &TypeKey,
		label: &str,
	) -> Result<Arc<dyn MetaContBase>, StoreError> {
		let factory = registry.lookup(payload).ok_or(StoreError::UnknownType(*payload))?;

		let mut conts = self.conts.write();
		let cont = match conts.get(label) {
			Some(existing) => Arc::clone(existing),
			None => {
				debug!(label, payload = %factory.payload(), "recording container");
				let cont: Arc<dyn MetaContBase> = Arc::from(factory.make(label));
				cont.set_proxy(Some(self.proxy));
				conts.insert(label.to_owned(), Arc::clone(&cont));
				cont
			}
		};
		drop(conts);

		if cont.data_type() != factory.payload() {
			return Err(StoreError::WrongType {
				label: label.to_owned(),
				existing: cont.data_type(),
				requested: factory.payload(),
			});
		}
		Ok(cont)
	}

	/// Typed access to an existing container.
	pub fn cont<T: Send + Sync + 'static>(&self, label: &str) -> Result<Option<Arc<MetaCont<T>>>, StoreError> {
		match self.cont_dyn(label) {
			Some(cont) => typed(label, cont).map(Some),
			None => Ok(None),
		}
	}

	/// Erased access to an existing container.
	pub fn cont_dyn(&self, label: &str) -> Option<Arc<dyn MetaContBase>> {
		self.conts.read().get(label).cloned()
	}

	/// Labels of all containers, sorted.
	pub fn labels(&self) -> Vec<String> {
		self.conts.read().keys().cloned().collect()
	}

	pub fn len(&self) -> usize {
		self.conts.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.conts.read().is_empty()
	}

	/// Writes the summary of every container, in label order.
	pub fn list(&self, out: &mut dyn io::Write) -> io::Result<()> {
		let conts: Vec<Arc<dyn MetaContBase>> = self.conts.read().values().cloned().collect();
		writeln!(out, "MetaStore {} containers={}", self.proxy, conts.len())?;
		for cont in conts {
			cont.list_sources(out, self.max_sources)?;
		}
		Ok(())
	}
}

impl Default for MetaStore {
	fn default() -> Self {
		Self::new()
	}
}

fn typed<T: Send + Sync + 'static>(label: &str, cont: Arc<dyn MetaContBase>) -> Result<Arc<MetaCont<T>>, StoreError> {
	let existing = cont.data_type();
	downcast_arc::<T>(cont).ok_or_else(|| StoreError::WrongType {
		label: label.to_owned(),
		existing,
		requested: TypeKey::of::<T>(),
	})
}
