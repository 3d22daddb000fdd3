//! Thread-safe typed metadata containers.
//!
//! A [`MetaCont<T>`] caches at most one payload of type `T` per data source
//! ([`SourceId`]). Containers of different payload types live side by side
//! behind [`MetaContBase`], usually inside a [`MetaStore`]. Payload types are
//! declared with [`metacont_def!`] so code holding only a [`TypeKey`] can
//! build the right container through the [`registry`].
//!
//! ```
//! use metacont::{MetaCont, SourceId};
//!
//! let cont = MetaCont::<u64>::new("EventCount");
//! assert!(cont.insert(SourceId::new("AOD.0001"), 1200).is_ok());
//! assert!(cont.insert(SourceId::new("AOD.0001"), 7).is_err());
//! assert_eq!(cont.find(SourceId::new("AOD.0001")).as_deref(), Some(&1200));
//! ```

pub mod config;
pub mod cont;
pub mod error;
pub mod registry;
pub mod source;
pub mod store;
pub mod types;

pub use config::Config;
pub use cont::{MetaCont, MetaContBase, downcast_arc};
pub use error::{ConfigError, Duplicate, ErasedPayload, InsertError, StoreError};
#[doc(hidden)]
pub use inventory;
pub use registry::{DuplicatePolicy, FactoryDef, FactoryRef, TypeRegistry};
pub use source::SourceId;
pub use store::MetaStore;
pub use types::{ProxyId, TypeKey};

/// Declares a container factory for a payload type.
///
/// ```ignore
/// metacont_def!(CutBookkeeperContainer);
/// // Current schema version, also reachable through its interface.
/// metacont_def!(EventFormatV2 => dyn EventFormat);
/// // Historical version, concrete key only.
/// metacont_def!(EventFormatV1 => dyn EventFormat, old);
/// ```
#[macro_export]
macro_rules! metacont_def {
	($payload:ty) => {
		$crate::inventory::submit! {
			$crate::registry::FactoryDef::of::<$payload>()
		}
	};
	($payload:ty => $transient:ty) => {
		$crate::inventory::submit! {
			$crate::registry::FactoryDef::of::<$payload>().transient::<$transient>()
		}
	};
	($payload:ty => $transient:ty, old) => {
		$crate::inventory::submit! {
			$crate::registry::FactoryDef::of::<$payload>()
				.transient::<$transient>()
				.old()
		}
	};
}
