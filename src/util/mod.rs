// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Small stateless helpers shared across the application.

pub mod debounce;
pub mod units;
