//! Process-wide registry of container factories.
//!
//! # Purpose
//!
//! Generic code that only holds a payload type descriptor uses the registry
//! to build the matching [`MetaCont<T>`](crate::MetaCont) behind
//! [`MetaContBase`](crate::MetaContBase).
//!
//! # Mental Model
//!
//! 1. **Declaration:** payload crates submit a [`FactoryDef`] through
//!    [`crate::metacont_def!`]. A schema-evolving payload declares its current
//!    version with the transient interface it implements, and its historical
//!    versions as `old`.
//! 2. **Startup:** [`init`] ingests every submitted definition in a fixed
//!    order before worker threads start.
//! 3. **Consumption:** [`lookup`] from any thread. A miss is a normal `None`.
//! 4. **Extension:** [`TypeRegistry::register`] after startup publishes a new
//!    snapshot atomically.
//!
//! # Conflicts
//!
//! Two factories bound to one key are resolved by [`DuplicatePolicy`]. The
//! default keeps the last registration and logs a warning; every conflict
//! is recorded in [`TypeRegistry::collisions`].

mod collision;
mod def;
mod table;

use std::sync::OnceLock;

pub use collision::{Collision, DuplicatePolicy, KeyKind, Resolution};
pub use def::{FactoryDef, FactoryRef, MakeCont};
pub use table::{Registration, TypeRegistry};
use tracing::{debug, warn};

use crate::config::Config;
use crate::types::TypeKey;

static GLOBAL: OnceLock<TypeRegistry> = OnceLock::new();

/// Initializes the process-wide registry from `config`.
///
/// Call once at program start. Later calls return the existing registry and
/// ignore `config`.
pub fn init(config: &Config) -> &'static TypeRegistry {
	if let Some(existing) = GLOBAL.get() {
		debug!("container registry already initialised");
		return existing;
	}
	GLOBAL.get_or_init(|| build(config))
}

/// Returns the process-wide registry, initialising it from defaults and the
/// environment if [`init`] was never called.
pub fn global() -> &'static TypeRegistry {
	GLOBAL.get_or_init(|| {
		let mut config = Config::default();
		if let Err(e) = config.apply_env() {
			warn!("ignoring environment override: {e}");
		}
		build(&config)
	})
}

/// Looks up `key` in the process-wide registry.
pub fn lookup(key: &TypeKey) -> Option<FactoryRef> {
	global().lookup(key)
}

/// Registers every `inventory`-submitted definition into `registry`.
///
/// Old versions are ingested before current ones, each group sorted by
/// payload name, so the outcome does not depend on link order.
pub fn register_submitted(registry: &TypeRegistry) -> usize {
	let mut defs: Vec<&'static FactoryDef> = inventory::iter::<FactoryDef>.into_iter().collect();
	defs.sort_by_cached_key(|def| (def.current, (def.payload)()));
	for def in &defs {
		registry.register(def);
	}
	defs.len()
}

fn build(config: &Config) -> TypeRegistry {
	let registry = TypeRegistry::with_policy(config.registry.duplicate_policy);
	let count = register_submitted(&registry);
	debug!(
		factories = count,
		keys = registry.len(),
		policy = ?registry.policy(),
		"container registry initialised"
	);
	registry
}
