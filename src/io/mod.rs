// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! I/O module - mesh import and export

mod obj;

pub use obj::{read_obj, write_obj};
