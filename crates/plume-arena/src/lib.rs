//! Fixed-capacity bump arenas for scoped asset lifetimes.
//!
//! An [`Arena`] owns one contiguous byte region and hands out
//! [`Allocation`] handles by bumping a cursor. There is no per-object free:
//! the only reclamation is [`Arena::rollback`], which resets the cursor and
//! bumps the arena's generation so every outstanding handle becomes stale.
//!
//! # Architecture
//!
//! ```text
//! ArenaSet (one per game session)
//! ├── Game     arena  (archive records, game metadata)
//! ├── Chapter  arena  (rolled back when a chapter is discarded)
//! └── Room     arena  (rolled back on every room change)
//! ```
//!
//! # Handle safety
//!
//! Handles record the arena's identity and generation at allocation time.
//! Resolving a handle after a rollback, or against a different arena,
//! returns [`ArenaError::StaleHandle`] / [`ArenaError::ForeignHandle`]
//! instead of aliasing reused memory.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod arena;
pub mod config;
pub mod error;
pub mod handle;
pub mod set;

pub use arena::{capacity_of, close, space_of, Arena, ALIGNMENT};
pub use config::{ArenaConfig, Placement};
pub use error::ArenaError;
pub use handle::{Allocation, ArenaId};
pub use set::{ArenaScope, ArenaSet};
