// SPDX-License-Identifier: MIT
// Suggestion request dispatch — decode, single-flight pipeline, reply policy.

pub mod dispatcher;
pub mod model;
