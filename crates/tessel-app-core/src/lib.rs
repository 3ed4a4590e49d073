// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared application services for Tessel tools.
//! Keeps binaries thin: they pick a `ConfigStore` and hand it to `ConfigService`.

pub mod config;
pub mod memory;
