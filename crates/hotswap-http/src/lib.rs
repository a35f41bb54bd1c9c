//! # hotswap-http
//!
//! The status and control surface of the Hotswap controller, plus the
//! routing of deployed applications' traffic.
//!
//! One shared listener serves three kinds of paths: the status page and
//! its JSON twin, the update trigger, and everything under a mounted
//! context path, which is handed to the embedded host. Anything else is
//! a 404.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod surface;
