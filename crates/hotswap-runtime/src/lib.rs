//! Redeploy orchestration for the Hotswap controller.
//!
//! The [`registry::Registry`] holds the fixed set of application records,
//! the [`coordinator::Controller`] drives each record's undeploy/deploy
//! state machine, and the [`host::ContainerHost`] trait is the seam to the
//! container runtime — served in-process by [`embedded::EmbeddedHost`].

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod coordinator;
pub mod embedded;
pub mod host;
pub mod registry;
pub mod session;
