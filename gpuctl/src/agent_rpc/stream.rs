use crate::agent_rpc::connection::{bounded, Deadline};
use crate::agent_rpc::rpc::BoxRecordStream;
use crate::error::{CtlError, RequestFailure};
use log::{debug, warn};
use std::fmt;
use std::future::Future;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Streaming,
    Draining,
    Failed,
    Closed,
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            StreamState::Idle => "idle",
            StreamState::Streaming => "streaming",
            StreamState::Draining => "draining",
            StreamState::Failed => "failed",
            StreamState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Drives the receive loop of one server-streaming call.
///
/// Records are handed to the renderer one at a time, in arrival order, and
/// the next receive is only issued once the renderer returned. The stream
/// handle is owned by [`StreamConsumer::run`] and dropped before it returns,
/// whichever way the loop ends.
pub struct StreamConsumer {
    operation: &'static str,
    deadline: Option<Deadline>,
    state: StreamState,
}

impl StreamConsumer {
    pub fn new(operation: &'static str, deadline: Option<Deadline>) -> Self {
        Self {
            operation,
            deadline,
            state: StreamState::Idle,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    fn enter(&mut self, next: StreamState) {
        debug!("{}: stream {} -> {}", self.operation, self.state, next);
        self.state = next;
    }

    fn fail(&mut self, err: CtlError) -> CtlError {
        warn!("{}", err);
        self.enter(StreamState::Failed);
        err
    }

    /// Opens the stream with `open` and renders every record until the
    /// explicit end-of-stream. Returns the number of rendered records.
    pub async fn run<T, O, R>(&mut self, open: O, mut render: R) -> Result<usize, CtlError>
    where
        T: Send,
        O: Future<Output = anyhow::Result<BoxRecordStream<T>>>,
        R: FnMut(T) -> Result<(), CtlError>,
    {
        if self.state != StreamState::Idle {
            return Err(CtlError::Stream {
                operation: self.operation,
                reason: format!("stream already {}", self.state),
            });
        }

        let operation = self.operation;
        let stream = match bounded(self.deadline, open).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(self.fail(CtlError::rejected(operation, e))),
            Err(timeout) => {
                return Err(self.fail(CtlError::Request {
                    operation,
                    reason: RequestFailure::DeadlineExceeded(timeout),
                }))
            }
        };
        let mut stream = scopeguard::guard(stream, move |_| debug!("{}: stream handle released", operation));
        self.enter(StreamState::Streaming);

        let mut count = 0;
        loop {
            let record = match bounded(self.deadline, stream.recv()).await {
                Ok(Ok(Some(record))) => record,
                Ok(Ok(None)) => {
                    self.enter(StreamState::Draining);
                    break;
                }
                Ok(Err(e)) => {
                    return Err(self.fail(CtlError::Stream {
                        operation,
                        reason: e.to_string(),
                    }))
                }
                Err(timeout) => {
                    return Err(self.fail(CtlError::Stream {
                        operation,
                        reason: format!("deadline of {:?} exceeded", timeout),
                    }))
                }
            };
            if let Err(e) = render(record) {
                return Err(self.fail(e));
            }
            count += 1;
        }

        drop(stream);
        self.enter(StreamState::Closed);
        debug!("{}: {} record(s) received", operation, count);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent_rpc::fake::{FakeStream, Probe, Tail};
    use futures::FutureExt;
    use std::panic::AssertUnwindSafe;
    use std::time::Duration;

    fn open(probe: &Probe, records: Vec<u32>, tail: Tail) -> impl Future<Output = anyhow::Result<BoxRecordStream<u32>>> {
        let stream: BoxRecordStream<u32> = Box::new(FakeStream::new(probe, records, tail));
        async move { Ok(stream) }
    }

    #[tokio::test]
    async fn renders_in_arrival_order() {
        for n in [0u32, 1, 100] {
            let probe = Probe::default();
            let records: Vec<u32> = (0..n).collect();
            let mut seen = vec![];
            let mut consumer = StreamConsumer::new("receiving", None);
            let count = consumer
                .run(open(&probe, records.clone(), Tail::End), |r| {
                    seen.push(r);
                    Ok(())
                })
                .await
                .unwrap();
            assert_eq!(count, n as usize);
            assert_eq!(seen, records);
            assert_eq!(consumer.state(), StreamState::Closed);
            assert_eq!(probe.streams_closed(), 1);
        }
    }

    #[tokio::test]
    async fn receive_error_keeps_rendered_records() {
        let probe = Probe::default();
        let mut seen = vec![];
        let mut consumer = StreamConsumer::new("receiving", None);
        let err = consumer
            .run(open(&probe, vec![1, 2], Tail::Error("reset by peer".into())), |r| {
                seen.push(r);
                Ok(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CtlError::Stream { .. }));
        assert!(err.to_string().contains("reset by peer"));
        assert_eq!(seen, vec![1, 2]);
        assert_eq!(consumer.state(), StreamState::Failed);
        assert_eq!(probe.streams_closed(), 1);
    }

    #[tokio::test]
    async fn open_failure_is_request_error() {
        let mut consumer = StreamConsumer::new("subscribing", None);
        let failing = async { Err::<BoxRecordStream<u32>, _>(anyhow::anyhow!("not allowed")) };
        let err = consumer.run(failing, |_| Ok(())).await.unwrap_err();
        assert!(matches!(err, CtlError::Request { .. }));
        assert_eq!(consumer.state(), StreamState::Failed);
    }

    #[tokio::test]
    async fn render_error_stops_the_loop() {
        let probe = Probe::default();
        let mut consumer = StreamConsumer::new("receiving", None);
        let err = consumer
            .run(open(&probe, vec![1, 2, 3], Tail::End), |r| {
                if r == 2 {
                    Err(CtlError::validation("bad record"))
                } else {
                    Ok(())
                }
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CtlError::Validation(_)));
        assert_eq!(probe.streams_closed(), 1);
    }

    #[tokio::test]
    async fn render_panic_still_releases_stream() {
        let probe = Probe::default();
        let mut consumer = StreamConsumer::new("receiving", None);
        let res = AssertUnwindSafe(consumer.run(open(&probe, vec![1], Tail::End), |_| -> Result<(), CtlError> {
            panic!("renderer bug")
        }))
        .catch_unwind()
        .await;
        assert!(res.is_err());
        assert_eq!(probe.streams_closed(), 1);
    }

    #[tokio::test]
    async fn receive_deadline_is_stream_error() {
        let probe = Probe::default();
        let deadline = Some(Deadline::after(Duration::from_millis(50)));
        let mut consumer = StreamConsumer::new("receiving", deadline);
        let err = consumer
            .run(open(&probe, vec![7], Tail::Pending), |_| Ok(()))
            .await
            .unwrap_err();
        assert!(matches!(err, CtlError::Stream { .. }));
        assert_eq!(probe.streams_closed(), 1);
    }

    #[tokio::test]
    async fn consumer_runs_once() {
        let probe = Probe::default();
        let mut consumer = StreamConsumer::new("receiving", None);
        consumer.run(open(&probe, vec![], Tail::End), |_| Ok(())).await.unwrap();
        let err = consumer
            .run(open(&probe, vec![], Tail::End), |_| Ok(()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already closed"));
    }
}
