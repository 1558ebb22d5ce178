//! Signal allocation and alias bookkeeping for sigflow models.
//!
//! The [`SignalStore`] is a build-time allocator. It owns the initial
//! contents of every base buffer and a table mapping each view to the
//! element range it aliases. [`SignalData`] is the runtime copy that
//! operators mutate during a step.
//!
//! ```text
//! SignalStore (build time)
//! ├── SignalMeta × N   (name, shape, dtype, readonly, base, offset)
//! └── initial values   (one Vec<f64> per base signal)
//!
//! SignalData (run time)
//! ├── buffers          (cloned from the initial values)
//! └── locations        (SignalId → base + element range)
//! ```
//!
//! The store performs no scheduling. Hazard analysis in `sigflow-graph`
//! resolves every view to its base through [`SignalStore::location`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod data;
pub mod error;
pub mod meta;
pub mod store;

pub use data::SignalData;
pub use error::StoreError;
pub use meta::{Initial, Location, SignalMeta};
pub use store::SignalStore;
