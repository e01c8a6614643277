// SPDX-License-Identifier: MIT

pub mod client;
