// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! I/O operations for motifs, layout documents, auto-saved state and exports.

pub mod export;
pub mod media;
pub mod persistence;
pub mod serialization;
