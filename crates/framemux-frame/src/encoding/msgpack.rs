use std::io::Write;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::Encoding;
use crate::error::{FrameError, Result};

/// MessagePack encoding using `rmp-serde`.
///
/// Structs are written as maps with field names (`write_named`), so peers
/// in other languages can decode them without a shared schema.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MsgPackEncoding;

impl Encoding for MsgPackEncoding {
    fn name(&self) -> &'static str {
        "msgpack"
    }

    fn encode_into<W: Write, T: Serialize + ?Sized>(
        &self,
        mut writer: W,
        value: &T,
    ) -> Result<()> {
        rmp_serde::encode::write_named(&mut writer, value)
            .map_err(|err| FrameError::encode(self.name(), err))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        rmp_serde::from_slice(bytes).map_err(|err| FrameError::decode(self.name(), err))
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Named {
        id: u8,
    }

    #[test]
    fn structs_are_encoded_as_maps() {
        let bytes = MsgPackEncoding.encode(&Named { id: 1 }).unwrap();
        // fixmap(1), fixstr "id", 1
        assert_eq!(bytes, [0x81, 0xa2, b'i', b'd', 0x01]);

        let decoded: Named = MsgPackEncoding.decode(&bytes).unwrap();
        assert_eq!(decoded, Named { id: 1 });
    }

    #[test]
    fn short_string_is_fixstr() {
        assert_eq!(MsgPackEncoding.encode("ok").unwrap(), [0xa2, b'o', b'k']);
    }
}
