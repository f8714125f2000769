// Routing Module
//
// Request and reply topics are derived from a service name by appending a fixed
// suffix. No separator is inserted beyond the suffix's own leading character.
//
//   "led" + "/_service_req"  ->  "led/_service_req"
//   "led" + "/_service_rep"  ->  "led/_service_rep"

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default suffix of the topic a service receives requests on
pub const DEFAULT_REQUEST_SUFFIX: &str = "/_service_req";

/// Default suffix of the topic a service publishes replies on
pub const DEFAULT_REPLY_SUFFIX: &str = "/_service_rep";

/// Concatenate `name` and `suffix` into a freshly allocated topic buffer.
///
/// Fails with `OutOfMemory` if the buffer cannot be allocated.
pub fn build_topic(name: &[u8], suffix: &[u8]) -> Result<Vec<u8>> {
    let mut topic = Vec::new();
    topic.try_reserve_exact(name.len() + suffix.len())?;
    topic.extend_from_slice(name);
    topic.extend_from_slice(suffix);
    Ok(topic)
}

/// The suffix pair used to derive service topics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceTopics {
    pub request_suffix: String,
    pub reply_suffix: String,
}

impl Default for ServiceTopics {
    fn default() -> Self {
        Self {
            request_suffix: DEFAULT_REQUEST_SUFFIX.to_string(),
            reply_suffix: DEFAULT_REPLY_SUFFIX.to_string(),
        }
    }
}

impl ServiceTopics {
    pub fn request_topic(&self, name: &[u8]) -> Result<Vec<u8>> {
        build_topic(name, self.request_suffix.as_bytes())
    }

    pub fn reply_topic(&self, name: &[u8]) -> Result<Vec<u8>> {
        build_topic(name, self.reply_suffix.as_bytes())
    }

    /// Length of the request topic for a name of `name_len` bytes
    pub fn request_topic_len(&self, name_len: usize) -> usize {
        name_len + self.request_suffix.len()
    }

    /// True if `topic` is exactly `name` followed by the request suffix
    pub fn is_request_topic_for(&self, topic: &[u8], name: &[u8]) -> bool {
        topic.len() == self.request_topic_len(name.len())
            && topic.starts_with(name)
            && &topic[name.len()..] == self.request_suffix.as_bytes()
    }
}
