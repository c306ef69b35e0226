//! Decoded records

use std::fmt;

use serde::{Deserialize, Serialize};

/// One decoded record: `(topic, message, index)`.
///
/// Built fresh for every read and owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Excerpt<T, M> {
    pub topic: T,
    pub message: M,
    pub index: u64,
}

impl<T, M> Excerpt<T, M> {
    pub fn new(topic: T, message: M, index: u64) -> Self {
        Self {
            topic,
            message,
            index,
        }
    }

    pub fn topic(&self) -> &T {
        &self.topic
    }

    pub fn message(&self) -> &M {
        &self.message
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn into_message(self) -> M {
        self.message
    }
}

impl<T: fmt::Display, M: fmt::Debug> fmt::Display for Excerpt<T, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} = {:?}", self.index, self.topic, self.message)
    }
}
