// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — codec dispatch, transform stage, and levels.

pub mod codec;
pub mod levels;
pub mod transform;
