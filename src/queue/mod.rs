//! Queue view subsystem
//!
//! Publish and read typed `(topic, message)` records over a log:
//!
//! - `publish` / `publish_and_index` / `set` append through the calling
//!   thread's write cursor
//! - `next`, `get(index)` and `get_topic` read through the thread's replay
//!   cursor; absence is `Ok(None)`, never an error
//! - `consume` reads through a separate sequential cursor
//!
//! # Usage
//!
//! ```ignore
//! use queueview::queue::{JsonCodec, QueueContext, QueueView};
//! use queueview::replication::Environment;
//!
//! let view: QueueView<String, u64> =
//!     QueueView::open(QueueContext::new("orders"), &Environment::new(), JsonCodec::new())?;
//! let index = view.publish_and_index(&"orders".to_string(), &42)?;
//! ```

mod codec;
mod context;
mod errors;
mod excerpt;
mod pool;
mod view;

pub use codec::{JsonCodec, TopicCodec};
pub use context::{default_base_path, QueueContext, DEFAULT_BASE_DIR};
pub use errors::{QueueError, QueueResult};
pub use excerpt::Excerpt;
pub use pool::{CursorPool, CursorSet};
pub use view::{QueueView, Subscriber, TopicPublisher, TopicSubscriber};
