//! # cropmark
//!
//! Crop a PNG to a client-chosen rectangle and, optionally, stamp it with a
//! logo taken from a stored per-user configuration.
//!
//! # Architecture
//!
//! ```text
//! request ──► service ──► store (ConfigGateway)   look up logo config by id + identity
//!                │
//!                └──────► imaging::Compositor     decode → crop → logo → [preview resize] → PNG
//! ```
//!
//! The pipeline is a pure function of its inputs: same source bytes, crop,
//! logo configuration, and mode always yield the same PNG bytes. Storage is
//! reached only through the [`store::ConfigGateway`] trait, so the pipeline
//! can be tested with an in-memory store.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Crop geometry, logo placement, image backend, and the compositor |
//! | [`store`] | SQLite-backed logo configurations scoped by owner identity |
//! | [`service`] | Request boundary: input parsing, config lookup, error classification |
//! | [`config`] | `cropmark.toml` settings: database path, decode limits, download name |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Logo Failures Never Fail a Crop
//!
//! The logo is decoration. An undecodable, oversized, or degenerate logo is
//! logged at `warn`, recorded as [`imaging::LogoStage::Skipped`], and the
//! cropped image is returned without it. Failures on the primary image are
//! always errors.
//!
//! ## PNG In, PNG Out
//!
//! Sources, logos, and outputs are all PNG. Inputs are sniffed by content,
//! never by declared type, and decoded under configurable size limits.
//!
//! ## Out-of-Bounds Crops Are Rejected
//!
//! A crop that does not fit inside the source is a client error rather than
//! being silently clamped to the image edges.

pub mod config;
pub mod imaging;
pub mod output;
pub mod service;
pub mod store;

#[cfg(test)]
pub(crate) mod test_helpers;
