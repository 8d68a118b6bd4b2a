// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Encoding of on-disk and hashed structures
//!
//! Every structure that is hashed or written to disk goes through these
//! helpers so that encoding stays deterministic across the crate.

use serde::de::DeserializeOwned;
use serde::Serialize;

pub type CodecError = serde_json::Error;

pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(value)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    serde_json::from_slice(bytes)
}

/// Whether two values have identical encodings
pub fn equal<T: Serialize + ?Sized>(a: &T, b: &T) -> Result<bool, CodecError> {
    Ok(encode(a)? == encode(b)?)
}
