// SPDX-License-Identifier: MIT
//! Workspace/auth coordination: two deduplicated signal cells, a
//! combine-latest reactor, and the ordered session-switch sequence.

pub mod reactor;
pub mod signals;
pub mod switcher;
