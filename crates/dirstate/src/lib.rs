#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `dirstate` implements the working-directory state index: a small
//! fixed-layout *docket* file naming a data-file generation, plus an
//! append-only *data file* holding a tree of 43-byte node records. It is
//! the core a `status` implementation drives; the command-line front end,
//! the ignore-file parser, and the directory walker that calls
//! `stat`/`readdir` are external collaborators.
//!
//! # Layout
//!
//! - [`codec`] — bounds-checked big-endian integer and slice readers.
//! - [`node`] — random-access decode of a single 43-byte record.
//! - [`tree`] — binary-search lookup and depth-first iteration over a
//!   decoded tree.
//! - [`overlay`] — the in-memory shadow of pending insert/update/remove
//!   operations.
//! - [`writer`] — merges an overlay against a base tree into either an
//!   append tail or a fresh data file.
//! - [`docket`] — the fixed-layout file naming the current generation.
//! - [`manager`] — ties the above together: open, load, commit.
//! - [`ignore_hash`] — the incremental digest over root ignore files.
//! - [`status`] — the clean/modified/ambiguous classification contract a
//!   filesystem walker drives against a tree.
//!
//! # Errors
//!
//! Every fallible entry point returns [`DirstateError`]. Parse errors
//! ([`DirstateError::InvalidMagic`], [`DirstateError::ShortDocket`],
//! [`DirstateError::CorruptIndex`]) and [`DirstateError::UnknownIdentifier`]
//! are fatal for the affected dirstate instance: callers should rebuild by
//! rescanning the working directory rather than attempt partial recovery.

pub mod codec;
pub mod docket;
pub mod error;
pub mod flags;
pub mod ignore_hash;
pub mod manager;
pub mod node;
pub mod overlay;
pub mod status;
pub mod tree;
pub mod writer;

pub use docket::{Docket, TreeMetadata};
pub use error::{DirstateError, Result};
pub use flags::NodeFlags;
pub use ignore_hash::FileIgnoreSource;
pub use manager::{DocketManager, DocketManagerConfig, LegacyFormat, OpenOutcome};
pub use node::{NodeData, NodeView};
pub use overlay::{Overlay, OverlayOp};
pub use status::{classify, can_skip_readdir, EntryStatus, ObservedStat, StatusObservation, StatusView};
pub use tree::Tree;
pub use writer::{CommitMode, CommitResult};
