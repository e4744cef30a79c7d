use std::io::Write;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::Encoding;
use crate::error::{FrameError, Result};

/// Compact binary encoding using `bincode`.
///
/// This is the default codec: fixed-width integers, length-prefixed
/// sequences, no field names on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BincodeEncoding;

impl Encoding for BincodeEncoding {
    fn name(&self) -> &'static str {
        "bincode"
    }

    fn encode_into<W: Write, T: Serialize + ?Sized>(&self, writer: W, value: &T) -> Result<()> {
        ::bincode::serialize_into(writer, value).map_err(|err| FrameError::encode(self.name(), err))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        ::bincode::deserialize(bytes).map_err(|err| FrameError::decode(self.name(), err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_wire_shape() {
        let bytes = BincodeEncoding.encode("hi").unwrap();
        // u64 little-endian length prefix, then UTF-8.
        assert_eq!(bytes, [2, 0, 0, 0, 0, 0, 0, 0, b'h', b'i']);
    }

    #[test]
    fn truncated_input_is_decode_error() {
        let err = BincodeEncoding.decode::<String>(&[5, 0, 0]).unwrap_err();
        assert!(matches!(err, FrameError::Decode { encoding: "bincode", .. }));
    }
}
