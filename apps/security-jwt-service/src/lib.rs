// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Security JWT Service - token lifecycle for client applications
//!
//! This crate issues, refreshes and validates signed JWT access/refresh
//! token pairs. Each registered client application has its own signing
//! configuration; a blacklist can deny users at any point.
//!
//! ## Modules
//!
//! - `auth` - Token codec, secret cipher and the authentication service
//! - `config` - Environment configuration
//! - `state` - Application state wiring
//! - `storage` - Caches, client configuration store and blacklist
//! - `telemetry` - Tracing subscriber setup

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod storage;
pub mod telemetry;
