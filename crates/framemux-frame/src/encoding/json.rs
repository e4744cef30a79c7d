use std::io::Write;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::Encoding;
use crate::error::{FrameError, Result};

/// Text encoding using `serde_json`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonEncoding;

impl Encoding for JsonEncoding {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode_into<W: Write, T: Serialize + ?Sized>(&self, writer: W, value: &T) -> Result<()> {
        serde_json::to_writer(writer, value).map_err(|err| FrameError::encode(self.name(), err))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(|err| FrameError::decode(self.name(), err))
    }
}
