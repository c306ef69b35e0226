//! Queue view
//!
//! Topic-addressed access to a log. Every record is one
//! `(topic, message)` pair stored as `(event name, value)`.
//!
//! # Cursors
//!
//! Each calling thread reads and writes through its own cursors (see
//! `CursorPool`). `next`, `get(index)` and `get_topic` share the thread's
//! replay cursor, so a `get(index)` repositions the following `next`.
//! `consume` uses a second, independent reader.
//!
//! # Replication
//!
//! The role is resolved when the view is built. On a sink `publish` and
//! `set` fail with `WriteForbidden` and leave the log untouched; records
//! streamed from the source go through `append_replicated`.

use std::fmt;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::codec::{JsonCodec, TopicCodec};
use super::context::QueueContext;
use super::errors::{QueueError, QueueResult};
use super::excerpt::Excerpt;
use super::pool::CursorPool;
use crate::log::{FileLog, Log, LogRecord, LOG_FILE_NAME};
use crate::observability::{Event, Logger, QueueMetrics};
use crate::replication::{
    resolve_role, CatchUpHandshake, Environment, ReceiveResult, ReplicaReceiver,
    ReplicatedRecord, ReplicationError, ReplicationRole,
};

/// Callback for every record on every topic
pub type TopicSubscriber<T, M> = Box<dyn Fn(&T, &M) + Send + Sync>;

/// Callback for records on one topic
pub type Subscriber<M> = Box<dyn Fn(&M) + Send + Sync>;

/// Publishing handle bound to one topic
pub type TopicPublisher<M> = Box<dyn Fn(&M) -> QueueResult<()> + Send + Sync>;

/// Topic-addressed view over a log.
pub struct QueueView<T, M, C = JsonCodec<T, M>> {
    context: QueueContext,
    full_name: String,
    log: Arc<dyn Log>,
    pool: CursorPool,
    codec: C,
    role: ReplicationRole,
    handshake: Option<CatchUpHandshake>,
    metrics: Arc<QueueMetrics>,
    closed: AtomicBool,
    _marker: PhantomData<fn() -> (T, M)>,
}

impl<T, M, C> QueueView<T, M, C>
where
    C: TopicCodec<T, M>,
{
    /// Open a file-backed view under `<base_path>/<name>/queue.log`.
    pub fn open(context: QueueContext, env: &Environment, codec: C) -> QueueResult<Self> {
        context.validate()?;
        let path = context.queue_dir(env.host_id()).join(LOG_FILE_NAME);
        let log = FileLog::open_with_config(&path, context.log_config()).map_err(|err| {
            if err.is_fatal() {
                let location = path.display().to_string();
                Logger::event(
                    Event::LogCorruption,
                    &[("path", location.as_str()), ("reason", err.message())],
                );
            }
            err
        })?;
        Self::with_log(Arc::new(log), context, env, codec)
    }

    /// Build a view over an existing log.
    ///
    /// Resolves the replication role and, on a sink, arms the catch-up
    /// handshake. Any failure other than missing collaborators aborts
    /// construction.
    pub fn with_log(
        log: Arc<dyn Log>,
        context: QueueContext,
        env: &Environment,
        codec: C,
    ) -> QueueResult<Self> {
        context.validate()?;
        let full_name = context.full_name();
        let role = resolve_role(&full_name, env)?;
        let metrics = Arc::new(QueueMetrics::new());

        let handshake = match role {
            ReplicationRole::Sink { source_host_id, .. } => {
                let manager = env.find_connection_manager(&context.cluster, source_host_id)?;
                Some(CatchUpHandshake::arm(
                    &full_name,
                    log.last_index(),
                    Arc::clone(&log),
                    manager.as_ref(),
                    Arc::clone(&metrics),
                ))
            }
            _ => None,
        };

        Logger::event(
            Event::QueueViewOpened,
            &[
                ("full_name", full_name.as_str()),
                ("name", context.name.as_str()),
                ("role", role.name()),
            ],
        );

        Ok(Self {
            pool: CursorPool::new(Arc::clone(&log)),
            context,
            full_name,
            log,
            codec,
            role,
            handshake,
            metrics,
            closed: AtomicBool::new(false),
            _marker: PhantomData,
        })
    }

    // ==================
    // Writes
    // ==================

    /// Append `message` under `topic`.
    pub fn publish(&self, topic: &T, message: &M) -> QueueResult<()> {
        self.publish_and_index(topic, message).map(|_| ())
    }

    /// Append `message` under `topic` and return its index.
    pub fn publish_and_index(&self, topic: &T, message: &M) -> QueueResult<u64> {
        self.check_local_write()?;
        let event_name = self.codec.encode_topic(topic)?;
        let value = self.codec.encode_message(message)?;
        self.append(&event_name, &value)
    }

    /// Append `message` under the empty topic and return its index.
    pub fn set(&self, message: &M) -> QueueResult<u64> {
        self.check_local_write()?;
        let value = self.codec.encode_message(message)?;
        self.append("", &value)
    }

    /// Append a record streamed from the source.
    ///
    /// Accepted regardless of role.
    pub fn append_replicated(&self, event_name: &str, value: &[u8]) -> QueueResult<u64> {
        let index = self.append(event_name, value)?;
        self.metrics.increment_replicated_applied();
        Ok(index)
    }

    /// Check `record` against `receiver` and append it if it is next.
    ///
    /// Returns the local index, or `None` for a duplicate. A gap is an
    /// error and nothing is appended.
    pub fn apply_replicated(
        &self,
        receiver: &mut ReplicaReceiver,
        record: &ReplicatedRecord,
    ) -> QueueResult<Option<u64>> {
        match receiver.receive(record) {
            ReceiveResult::Accepted => {
                let index = self.append_replicated(&record.event_name, &record.value)?;
                receiver.apply(record);
                Ok(Some(index))
            }
            ReceiveResult::Duplicate => Ok(None),
            ReceiveResult::GapDetected { expected, received } => {
                let expected_s = expected.to_string();
                let received_s = received.to_string();
                Logger::event(
                    Event::ReplicaGapDetected,
                    &[
                        ("expected", expected_s.as_str()),
                        ("full_name", self.full_name.as_str()),
                        ("received", received_s.as_str()),
                    ],
                );
                Err(ReplicationError::index_gap(expected, received).into())
            }
        }
    }

    fn append(&self, event_name: &str, value: &[u8]) -> QueueResult<u64> {
        let index = self
            .pool
            .with_cursors(|c| Ok(c.appender.append(event_name, value)?))?;
        self.metrics.increment_published();
        Ok(index)
    }

    fn check_local_write(&self) -> QueueResult<()> {
        if let Err(err) = self.role.check_local_write(&self.full_name) {
            self.metrics.increment_writes_rejected();
            Logger::event(
                Event::WriteRejected,
                &[("full_name", self.full_name.as_str()), ("reason", err.message.as_str())],
            );
            return Err(QueueError::WriteForbidden(err.message));
        }
        Ok(())
    }

    // ==================
    // Reads
    // ==================

    /// Next record on this thread's replay cursor, `None` when caught up.
    ///
    /// Records whose topic does not decode are skipped and counted in
    /// `scan_skipped`, as in `get_topic`.
    pub fn next(&self) -> QueueResult<Option<Excerpt<T, M>>> {
        let mut skipped = 0u64;
        let found = self.pool.with_cursors(|c| {
            while let Some(record) = c.replay.read_next()? {
                match self.codec.decode_topic(&record.event_name) {
                    Ok(topic) => return Ok(Some((topic, record))),
                    Err(_) => skipped += 1,
                }
            }
            Ok(None)
        });
        self.metrics.add_scan_skipped(skipped);

        match found? {
            Some((topic, record)) => {
                let message = self.codec.decode_message(&record.value)?;
                self.metrics.increment_reads();
                Ok(Some(Excerpt::new(topic, message, record.index)))
            }
            None => Ok(None),
        }
    }

    /// Record at `index`, `None` when absent.
    ///
    /// A seek that times out also yields `None`; use `try_get` to tell
    /// the two apart.
    pub fn get(&self, index: u64) -> QueueResult<Option<Excerpt<T, M>>> {
        match self.try_get(index) {
            Err(err) if err.is_seek_timeout() => Ok(None),
            other => other,
        }
    }

    /// Record at `index`; a seek timeout is an error.
    ///
    /// Leaves the replay cursor just past `index` on success.
    pub fn try_get(&self, index: u64) -> QueueResult<Option<Excerpt<T, M>>> {
        let record = self.pool.with_cursors(|c| {
            if !c.replay.move_to_index(index)? {
                return Ok(None);
            }
            Ok(c.replay.read_next()?)
        })?;
        record.map(|r| self.decode(r)).transpose()
    }

    /// Scan forward from the replay cursor for the next record on `topic`.
    ///
    /// Never wraps: records before the cursor are not revisited until
    /// `rewind`. Records whose topic does not decode never match.
    pub fn get_topic(&self, topic: &T) -> QueueResult<Option<Excerpt<T, M>>>
    where
        T: PartialEq,
    {
        let mut skipped = 0u64;
        let found = self.pool.with_cursors(|c| {
            while let Some(record) = c.replay.read_next()? {
                match self.codec.decode_topic(&record.event_name) {
                    Ok(candidate) if candidate == *topic => return Ok(Some((candidate, record))),
                    _ => skipped += 1,
                }
            }
            Ok(None)
        });
        self.metrics.add_scan_skipped(skipped);

        match found? {
            Some((topic, record)) => {
                let message = self.codec.decode_message(&record.value)?;
                self.metrics.increment_reads();
                Ok(Some(Excerpt::new(topic, message, record.index)))
            }
            None => Ok(None),
        }
    }

    /// Hand the next record on the plain reader to `f`.
    ///
    /// `f` gets the raw topic and the decoded message. Returns whether a
    /// record was consumed.
    pub fn consume<F>(&self, f: F) -> QueueResult<bool>
    where
        F: FnOnce(&str, M),
    {
        let record = self.pool.with_cursors(|c| Ok(c.tailer.read_next()?))?;
        match record {
            Some(record) => {
                let message = self.codec.decode_message(&record.value)?;
                self.metrics.increment_reads();
                f(&record.event_name, message);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Move this thread's replay cursor back to the first index.
    pub fn rewind(&self) -> QueueResult<()> {
        self.pool.with_cursors(|c| {
            c.replay.to_start();
            Ok(())
        })
    }

    /// Drop this thread's cursors. Returns whether it had any.
    pub fn release_thread(&self) -> bool {
        self.pool.release_current()
    }

    fn decode(&self, record: LogRecord) -> QueueResult<Excerpt<T, M>> {
        let topic = self.codec.decode_topic(&record.event_name)?;
        let message = self.codec.decode_message(&record.value)?;
        self.metrics.increment_reads();
        Ok(Excerpt::new(topic, message, record.index))
    }

    // ==================
    // Log management
    // ==================

    pub fn first_index(&self) -> Option<u64> {
        self.log.first_index()
    }

    pub fn last_index(&self) -> Option<u64> {
        self.log.last_index()
    }

    /// Remove every record. Indices keep increasing afterwards.
    pub fn clear(&self) -> QueueResult<()> {
        self.log.clear()?;
        Logger::event(Event::QueueCleared, &[("full_name", self.full_name.as_str())]);
        Ok(())
    }

    /// Text rendering of every record.
    pub fn dump(&self) -> QueueResult<String> {
        Ok(self.log.dump()?)
    }

    /// Release every cursor and close the log. Safe to call repeatedly.
    pub fn close(&self) -> QueueResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.pool.clear();
        self.log.close()?;
        Logger::event(Event::QueueViewClosed, &[("full_name", self.full_name.as_str())]);
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    // ==================
    // Accessors
    // ==================

    pub fn role(&self) -> ReplicationRole {
        self.role
    }

    pub fn context(&self) -> &QueueContext {
        &self.context
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn log(&self) -> &Arc<dyn Log> {
        &self.log
    }

    pub fn metrics(&self) -> &QueueMetrics {
        &self.metrics
    }

    /// Armed catch-up listener, on a sink
    pub fn handshake(&self) -> Option<&CatchUpHandshake> {
        self.handshake.as_ref()
    }

    // ==================
    // Unsupported
    // ==================

    pub fn register_topic_subscriber(&self, _subscriber: TopicSubscriber<T, M>) -> QueueResult<()> {
        Err(QueueError::Unimplemented("register_topic_subscriber"))
    }

    pub fn unregister_topic_subscriber(
        &self,
        _subscriber: &TopicSubscriber<T, M>,
    ) -> QueueResult<()> {
        Err(QueueError::Unimplemented("unregister_topic_subscriber"))
    }

    pub fn publisher(&self, _topic: &T) -> QueueResult<TopicPublisher<M>> {
        Err(QueueError::Unimplemented("publisher"))
    }

    pub fn register_subscriber(&self, _topic: &T, _subscriber: Subscriber<M>) -> QueueResult<()> {
        Err(QueueError::Unimplemented("register_subscriber"))
    }

    pub fn unregister_subscriber(&self, _topic: &T, _subscriber: &Subscriber<M>) -> QueueResult<()> {
        Err(QueueError::Unimplemented("unregister_subscriber"))
    }

    pub fn subscriber_count(&self) -> QueueResult<usize> {
        Err(QueueError::Unimplemented("subscriber_count"))
    }

    pub fn path(&self) -> QueueResult<PathBuf> {
        Err(QueueError::Unimplemented("path"))
    }

    pub fn wire_type(&self) -> QueueResult<&'static str> {
        Err(QueueError::Unimplemented("wire_type"))
    }
}

impl<T, M, C> fmt::Debug for QueueView<T, M, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueView")
            .field("full_name", &self.full_name)
            .field("role", &self.role)
            .field("log", &self.log)
            .field("closed", &self.closed.load(Ordering::Acquire))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::{Appender, LogError, LogResult, MemoryLog, Tailer};
    use crate::replication::{
        LocalConnectionManager, StaticCluster, StaticClusters, StaticHostIdentifier,
        StaticQueueSource,
    };

    type StringView = QueueView<String, String>;

    fn view() -> (MemoryLog, StringView) {
        let log = MemoryLog::new();
        let view = QueueView::with_log(
            Arc::new(log.clone()),
            QueueContext::new("orders"),
            &Environment::new(),
            JsonCodec::new(),
        )
        .unwrap();
        (log, view)
    }

    fn t(s: &str) -> String {
        s.to_string()
    }

    fn sink_view() -> (MemoryLog, StringView, Arc<LocalConnectionManager>) {
        let (manager, _rx) = LocalConnectionManager::new(1);
        let manager = Arc::new(manager);
        let cluster = StaticCluster::new().with_peer(manager.clone());
        let env = Environment::new()
            .with_host_identifier(Arc::new(StaticHostIdentifier(2)))
            .with_queue_source(Arc::new(StaticQueueSource::new().with_source("/orders", 1)))
            .with_clusters(Arc::new(
                StaticClusters::new().with_cluster("cluster", Arc::new(cluster)),
            ));
        let log = MemoryLog::new();
        let view = QueueView::with_log(
            Arc::new(log.clone()),
            QueueContext::new("orders"),
            &env,
            JsonCodec::new(),
        )
        .unwrap();
        (log, view, manager)
    }

    #[test]
    fn test_publish_get_next_scenario() {
        let (_log, view) = view();
        assert_eq!(view.publish_and_index(&t("orders"), &t("msg1")).unwrap(), 0);
        assert_eq!(view.publish_and_index(&t("orders"), &t("msg2")).unwrap(), 1);

        let excerpt = view.get(0).unwrap().unwrap();
        assert_eq!(excerpt, Excerpt::new(t("orders"), t("msg1"), 0));

        assert!(view.release_thread());
        assert_eq!(view.next().unwrap().unwrap().message, "msg1");
        assert_eq!(view.next().unwrap().unwrap().message, "msg2");
        assert!(view.next().unwrap().is_none());
    }

    #[test]
    fn test_next_skips_records_with_undecodable_topic() {
        let view: QueueView<u32, String> = QueueView::with_log(
            Arc::new(MemoryLog::new()),
            QueueContext::new("orders"),
            &Environment::new(),
            JsonCodec::new(),
        )
        .unwrap();
        view.publish(&1, &t("a")).unwrap();
        view.set(&t("untyped")).unwrap();
        view.publish(&2, &t("c")).unwrap();

        let first = view.next().unwrap().unwrap();
        assert_eq!((first.topic, first.index), (1, 0));
        let second = view.next().unwrap().unwrap();
        assert_eq!((second.topic, second.index), (2, 2));
        assert!(view.next().unwrap().is_none());
        assert_eq!(view.metrics().snapshot().scan_skipped, 1);
    }

    #[test]
    fn test_get_beyond_last_is_absent() {
        let (_log, view) = view();
        assert!(view.get(0).unwrap().is_none());
        view.publish(&t("a"), &t("1")).unwrap();
        assert!(view.get(1).unwrap().is_none());
        assert!(view.get(u64::MAX).unwrap().is_none());
    }

    #[test]
    fn test_topic_scan_is_forward_only() {
        let (_log, view) = view();
        for topic in ["A", "B", "A", "C"] {
            view.publish(&t(topic), &t(topic)).unwrap();
        }

        assert_eq!(view.get_topic(&t("A")).unwrap().unwrap().index, 0);
        assert_eq!(view.get_topic(&t("A")).unwrap().unwrap().index, 2);
        assert!(view.get_topic(&t("A")).unwrap().is_none());
        assert!(view.get_topic(&t("B")).unwrap().is_none());

        view.rewind().unwrap();
        assert_eq!(view.get_topic(&t("B")).unwrap().unwrap().index, 1);
        assert_eq!(view.metrics().snapshot().scan_skipped, 3);
    }

    #[test]
    fn test_get_repositions_next() {
        let (_log, view) = view();
        for i in 0..4 {
            view.publish(&t("x"), &i.to_string()).unwrap();
        }
        assert_eq!(view.get(2).unwrap().unwrap().index, 2);
        assert_eq!(view.next().unwrap().unwrap().index, 3);
    }

    #[test]
    fn test_consume_uses_independent_reader() {
        let (_log, view) = view();
        view.publish(&t("a"), &t("first")).unwrap();
        view.set(&t("second")).unwrap();

        assert_eq!(view.next().unwrap().unwrap().index, 0);

        let mut seen = Vec::new();
        while view.consume(|topic, message| seen.push((topic.to_string(), message))).unwrap() {}
        assert_eq!(
            seen,
            vec![(t("a"), t("first")), (t(""), t("second"))]
        );
    }

    #[test]
    fn test_sink_rejects_publish_without_mutation() {
        let (log, view, _manager) = sink_view();
        assert!(view.role().is_replicating());

        for _ in 0..3 {
            assert!(view.publish(&t("a"), &t("b")).unwrap_err().is_write_forbidden());
        }
        assert!(view.set(&t("b")).unwrap_err().is_write_forbidden());
        assert!(log.is_empty());
        assert_eq!(view.metrics().snapshot().writes_rejected, 4);

        assert_eq!(view.append_replicated("a", br#""b""#).unwrap(), 0);
        assert_eq!(view.get(0).unwrap().unwrap().message, "b");
    }

    #[test]
    fn test_apply_replicated_ordering() {
        let (log, view, _manager) = sink_view();
        let mut receiver = ReplicaReceiver::new(-1);
        let record = |index: u64| ReplicatedRecord {
            index,
            event_name: t("a"),
            value: br#""v""#.to_vec(),
        };

        assert_eq!(view.apply_replicated(&mut receiver, &record(0)).unwrap(), Some(0));
        assert_eq!(view.apply_replicated(&mut receiver, &record(0)).unwrap(), None);
        assert!(view.apply_replicated(&mut receiver, &record(5)).is_err());
        assert_eq!(log.len(), 1);
        assert_eq!(view.metrics().snapshot().replicated_applied, 1);
    }

    #[test]
    fn test_close_is_idempotent() {
        let (log, view) = view();
        view.publish(&t("a"), &t("b")).unwrap();
        view.close().unwrap();
        view.close().unwrap();
        assert!(view.is_closed());
        assert!(log.is_closed());
        assert!(view.publish(&t("a"), &t("b")).is_err());
    }

    #[test]
    fn test_clear_never_reuses_indices() {
        let (_log, view) = view();
        view.publish(&t("a"), &t("1")).unwrap();
        view.publish(&t("a"), &t("2")).unwrap();
        view.clear().unwrap();
        assert_eq!(view.first_index(), None);
        assert_eq!(view.last_index(), None);
        assert_eq!(view.publish_and_index(&t("a"), &t("3")).unwrap(), 2);
        assert_eq!(view.first_index(), Some(2));
    }

    #[test]
    fn test_unimplemented_surface() {
        let (_log, view) = view();
        assert!(view.register_topic_subscriber(Box::new(|_, _| {})).unwrap_err().is_unimplemented());
        assert!(view.publisher(&t("a")).err().unwrap().is_unimplemented());
        assert!(view.register_subscriber(&t("a"), Box::new(|_| {})).unwrap_err().is_unimplemented());
        assert!(view.subscriber_count().unwrap_err().is_unimplemented());
        assert!(view.path().unwrap_err().is_unimplemented());
        assert!(view.wire_type().unwrap_err().is_unimplemented());
    }

    #[test]
    fn test_dump_lists_records() {
        let (_log, view) = view();
        view.publish(&t("orders"), &t("msg1")).unwrap();
        let dump = view.dump().unwrap();
        assert!(dump.contains("0: orders = \"msg1\""));
    }

    // A log whose seeks always time out.
    #[derive(Debug, Clone, Default)]
    struct StallingLog(MemoryLog);

    struct StallingTailer(Box<dyn Tailer>);

    impl Tailer for StallingTailer {
        fn read_next(&mut self) -> LogResult<Option<LogRecord>> {
            self.0.read_next()
        }
        fn move_to_index(&mut self, index: u64) -> LogResult<bool> {
            Err(LogError::seek_timeout(index))
        }
        fn index(&self) -> u64 {
            self.0.index()
        }
        fn to_start(&mut self) {
            self.0.to_start()
        }
    }

    impl Log for StallingLog {
        fn create_appender(&self) -> LogResult<Box<dyn Appender>> {
            self.0.create_appender()
        }
        fn create_tailer(&self) -> LogResult<Box<dyn Tailer>> {
            Ok(Box::new(StallingTailer(self.0.create_tailer()?)))
        }
        fn first_index(&self) -> Option<u64> {
            self.0.first_index()
        }
        fn last_index(&self) -> Option<u64> {
            self.0.last_index()
        }
        fn clear(&self) -> LogResult<()> {
            self.0.clear()
        }
        fn dump(&self) -> LogResult<String> {
            self.0.dump()
        }
        fn close(&self) -> LogResult<()> {
            self.0.close()
        }
        fn is_closed(&self) -> bool {
            self.0.is_closed()
        }
    }

    #[test]
    fn test_seek_timeout_absent_from_get_but_visible_in_try_get() {
        let view: StringView = QueueView::with_log(
            Arc::new(StallingLog::default()),
            QueueContext::new("orders"),
            &Environment::new(),
            JsonCodec::new(),
        )
        .unwrap();
        view.publish(&t("a"), &t("b")).unwrap();

        assert!(view.get(0).unwrap().is_none());
        assert!(view.try_get(0).unwrap_err().is_seek_timeout());
    }
}
