// SPDX-License-Identifier: MIT

pub mod daemon;
pub mod extension;
pub mod settings;
pub mod suggestion;
pub mod workspace;
