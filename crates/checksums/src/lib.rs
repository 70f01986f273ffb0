#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `checksums` provides the streaming cryptographic digest used to fingerprint
//! the ignore-pattern corpus referenced by a dirstate docket (§4.4 of the
//! dirstate-v2 design). The docket's tree metadata reserves exactly 20 bytes
//! for this hash, which is the natural width of a SHA-1 digest, so this crate
//! exposes a single streaming SHA-1 wrapper behind the [`strong::StrongDigest`]
//! trait rather than a family of negotiable algorithms.
//!
//! # Invariants
//!
//! - The digest is fed incrementally via [`strong::StrongDigest::update`];
//!   callers must never materialise the full expanded contents of an ignore
//!   file in memory solely to hash it.
//! - [`strong::Sha1::finalize`] always returns exactly 20 bytes.
//!
//! # Examples
//!
//! ```
//! use checksums::strong::{Sha1, StrongDigest};
//!
//! let mut hasher = Sha1::new();
//! hasher.update(b"ignore file contents");
//! hasher.update(b"included file contents");
//! let digest = hasher.finalize();
//! assert_eq!(digest.len(), 20);
//! ```

pub mod strong;
