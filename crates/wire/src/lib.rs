// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The Ouroboros Authors

//! IPC protocol between `ouroctl` and a running supervisor.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload.

mod codec;
mod query;
mod response;

pub use codec::{decode, encode, read_message, read_query, write_message, write_response, ProtocolError};
pub use query::Query;
pub use response::{Response, StatusReport};

#[cfg(test)]
mod wire_tests;
