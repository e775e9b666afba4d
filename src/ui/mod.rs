// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! UI components for the Plate Stage application.

pub mod dimension_field;
pub mod plates_panel;
pub mod stage;
pub mod toolbar;
