//! # The VulSim Compiler
//!
//! This crate plumbs together the VulSim compiler crates and provides a
//! command-line interface for the compiler. It reads the bundle and combine
//! descriptors of a project and writes the generated C++ units along with
//! the support headers they include.
//! Depend on [`vulsim_frontend`], [`vulsim_ir`] and [`vulsim_backend`]
//! instead when only part of the pipeline is needed.
pub mod cmdline;
pub mod config;
pub mod driver;
mod support;
