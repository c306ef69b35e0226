//! Topic codec
//!
//! A record stores the topic as its event name and the message as its
//! value. The codec converts between those raw parts and typed values.
//! Topic and message decode separately so a scan can reject a record on
//! its topic alone.

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::errors::{QueueError, QueueResult};

/// Converts typed topics and messages to and from record parts.
pub trait TopicCodec<T, M>: Send + Sync {
    fn encode_topic(&self, topic: &T) -> QueueResult<String>;

    fn decode_topic(&self, event_name: &str) -> QueueResult<T>;

    fn encode_message(&self, message: &M) -> QueueResult<Vec<u8>>;

    fn decode_message(&self, value: &[u8]) -> QueueResult<M>;
}

/// Topics through `Display`/`FromStr`, messages as JSON.
pub struct JsonCodec<T, M> {
    _marker: PhantomData<fn() -> (T, M)>,
}

impl<T, M> JsonCodec<T, M> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T, M> Default for JsonCodec<T, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, M> Clone for JsonCodec<T, M> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T, M> fmt::Debug for JsonCodec<T, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("JsonCodec")
    }
}

impl<T, M> TopicCodec<T, M> for JsonCodec<T, M>
where
    T: fmt::Display + FromStr,
    T::Err: fmt::Display,
    M: Serialize + DeserializeOwned,
{
    fn encode_topic(&self, topic: &T) -> QueueResult<String> {
        Ok(topic.to_string())
    }

    fn decode_topic(&self, event_name: &str) -> QueueResult<T> {
        event_name
            .parse()
            .map_err(|e: T::Err| QueueError::Codec(format!("topic '{}': {}", event_name, e)))
    }

    fn encode_message(&self, message: &M) -> QueueResult<Vec<u8>> {
        serde_json::to_vec(message).map_err(|e| QueueError::Codec(e.to_string()))
    }

    fn decode_message(&self, value: &[u8]) -> QueueResult<M> {
        serde_json::from_slice(value).map_err(|e| QueueError::Codec(e.to_string()))
    }
}
