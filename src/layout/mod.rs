// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Geometry of the plate stage and its shared background.

pub mod compositor;
pub mod stage;
pub mod strip;
