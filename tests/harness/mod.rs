// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test harness for relay abuse simulation and HTTP-level tests.
//!
//! Provides spam pattern generators, outcome metrics and in-process fakes
//! for the Discord API so no test touches the network.

#![allow(dead_code)]

pub mod attacks;
pub mod fakes;
pub mod generators;
pub mod metrics;
