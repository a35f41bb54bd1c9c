//! # hotswap-artifact
//!
//! Artifact resolution for the Hotswap controller.
//!
//! Handles:
//! - **Coordinates**: version ordering and floor-based selection.
//! - **Resolvers**: the [`resolver::ArtifactResolver`] trait and its
//!   transitive dependency flattening.
//! - **Local repositories**: directory-layout archives with dependency
//!   manifests.
//! - **Remote repositories**: HTTP index fetch, cached downloads, SHA-256
//!   verification.
//! - **Hashing**: SHA-256 content verification.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod coordinate;
pub mod hash;
pub mod local;
pub mod remote;
pub mod repository;
pub mod resolver;
