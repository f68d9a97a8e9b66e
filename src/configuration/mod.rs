//! All configuration-relevant code, including the full configuration structure
//! as well as methods needed to load and validate it.
//!
//! Your starting point should probably be [`Configuration::load_or_default`].
//!
//! # Internals
//! The configuration structure is based on the concept of
//! unvalidated ("unresolved") and validated configuration structures.
//!
//! Even though callers interact with [`Configuration`], loading
//! deserializes the file into the [`UnresolvedConfiguration`] structure first.
//! Its `resolve` method then recursively turns it
//! (and its tables) into validated ("resolved") versions.
//!
//! Every table and field has a default, so a missing configuration file
//! (or a partial one) still resolves into a usable [`Configuration`].
//! Validation lives in [`resolve`][traits::ResolvableConfiguration::resolve],
//! e.g. rejecting a zero sample rate or an unparsable log level filter.

#![allow(rustdoc::private_intra_doc_links)]

mod structure;
mod traits;
mod utilities;

pub use structure::*;
