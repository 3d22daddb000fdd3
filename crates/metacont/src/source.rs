//! Source identifiers.
//!
//! A [`SourceId`] names one logical data source (an input file GUID, a run
//! provenance tag) within a container. Text is interned once per process, so
//! the id itself is a single copyable pointer.
//!
//! Interned text is never freed: memory grows with the number of distinct
//! source texts seen, not with the number of ids created. Processes that see
//! an unbounded stream of new sources can watch [`interned`].

use std::fmt;
use std::sync::LazyLock;

use parking_lot::RwLock;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

static INTERNER: LazyLock<RwLock<FxHashSet<&'static str>>> = LazyLock::new(Default::default);

/// Returns the process-wide copy of `text`, leaking it on first sight.
fn intern(text: &str) -> &'static str {
	if let Some(existing) = INTERNER.read().get(text).copied() {
		return existing;
	}
	let mut set = INTERNER.write();
	// Another writer may have raced us between the two locks.
	if let Some(existing) = set.get(text).copied() {
		return existing;
	}
	let leaked: &'static str = Box::leak(text.to_owned().into_boxed_str());
	set.insert(leaked);
	leaked
}

/// Number of distinct source texts interned so far in this process.
pub fn interned() -> usize {
	INTERNER.read().len()
}

/// Opaque identifier of a metadata source.
///
/// Equality, ordering and hashing follow the source text, so ids are stable
/// map keys and iterate in the same order across runs. Each distinct text is
/// leaked once and lives until process exit.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceId(&'static str);

impl SourceId {
	/// Interns `text` and returns its id.
	pub fn new(text: &str) -> Self {
		Self(intern(text))
	}

	/// Returns the source text.
	pub const fn as_str(self) -> &'static str {
		self.0
	}
}

impl fmt::Display for SourceId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.0)
	}
}

impl fmt::Debug for SourceId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("SourceId").field(&self.0).finish()
	}
}

impl From<&str> for SourceId {
	fn from(text: &str) -> Self {
		Self::new(text)
	}
}

impl From<String> for SourceId {
	fn from(text: String) -> Self {
		Self::new(&text)
	}
}

impl Serialize for SourceId {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(self.0)
	}
}

impl<'de> Deserialize<'de> for SourceId {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let text = String::deserialize(deserializer)?;
		Ok(Self::new(&text))
	}
}
