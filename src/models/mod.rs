// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Data models for plates and the persisted layout configuration.

pub mod config;
pub mod plate;
