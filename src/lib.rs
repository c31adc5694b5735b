// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Companion tooling for a personal dotfiles collection.
//!
//! The dotfiles themselves are inert configuration that the shell and Git
//! consume directly. Dotkit owns the two pieces of the collection that are
//! programs: prompt segment computation for the shell theme ([`label`]),
//! and regeneration of the SSH directory from a 1Password vault ([`ssh`]).

pub mod config;
pub mod label;
pub mod path;
pub mod ssh;
