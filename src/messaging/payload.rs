use std::io::Read;

use serde::de::DeserializeOwned;

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("payload could not be deserialized: {0}")]
    Deserialize(#[from] serde_json::Error),
}

/// Body of an inbound message, read on demand into the shape the handler wants.
pub trait MessagePayload {
    fn read_from_json<T: DeserializeOwned>(&mut self) -> Result<T, PayloadError>;
}

/// Payload backed by a byte stream. The stream is consumed by the first read;
/// reading again hits end of input and fails to deserialize.
#[derive(Debug)]
pub struct MessagePayloadStream<R> {
    inner: R,
}

impl<R: Read> MessagePayloadStream<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> MessagePayload for MessagePayloadStream<R> {
    fn read_from_json<T: DeserializeOwned>(&mut self) -> Result<T, PayloadError> {
        Ok(serde_json::from_reader(&mut self.inner)?)
    }
}
