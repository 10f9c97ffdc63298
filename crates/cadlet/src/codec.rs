//! Length-delimited JSON framing for the inbound transport.
//!
//! A 4-byte big-endian length prefix followed by a JSON document. Works over
//! any `AsyncRead`/`AsyncWrite`, typed per direction so a connection decodes
//! requests and encodes responses without ambiguity.

use std::io;
use std::marker::PhantomData;

use serde::{Serialize, de::DeserializeOwned};
use tokio_util::bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

pub struct JsonCodec<T> {
    framing: LengthDelimitedCodec,
    _marker: PhantomData<T>,
}

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        Self {
            framing: LengthDelimitedCodec::builder()
                .length_field_length(4)
                .new_codec(),
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DeserializeOwned> Decoder for JsonCodec<T> {
    type Item = T;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.framing.decode(src)? {
            Some(frame) => {
                let item = serde_json::from_slice(&frame)
                    .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
                Ok(Some(item))
            }
            None => Ok(None),
        }
    }
}

impl<T: Serialize> Encoder<T> for JsonCodec<T> {
    type Error = io::Error;

    fn encode(&mut self, item: T, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let json = serde_json::to_vec(&item)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        self.framing.encode(Bytes::from(json), dst)
    }
}
