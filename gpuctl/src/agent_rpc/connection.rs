use crate::agent_rpc::rpc::AgentApi;
use crate::agent_rpc::stream::StreamConsumer;
use crate::config::ClientConfig;
use crate::error::{CtlError, RequestFailure};
use async_trait::async_trait;
use log::{debug, warn};
use model::{ApiReply, ApiStatus};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Opens a channel to the agent. Implemented by the WebSocket transport and
/// by the fakes used in tests.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self, cfg: &ClientConfig) -> anyhow::Result<Box<dyn AgentApi>>;
}

/// Point in time after which a call of this invocation is abandoned.
#[derive(Clone, Copy, Debug)]
pub struct Deadline {
    at: Instant,
    timeout: Duration,
}

impl Deadline {
    pub fn after(timeout: Duration) -> Self {
        Self {
            at: Instant::now() + timeout,
            timeout,
        }
    }
}

/// Runs `fut` to completion, or until `deadline` passes.
pub async fn bounded<F: Future>(deadline: Option<Deadline>, fut: F) -> Result<F::Output, Duration> {
    match deadline {
        Some(d) => tokio::time::timeout_at(d.at, fut).await.map_err(|_| d.timeout),
        None => Ok(fut.await),
    }
}

/// Establishes a connection, waiting at most `cfg.connect_timeout`.
pub async fn connect(connector: &dyn Connector, cfg: &ClientConfig) -> Result<Connection, CtlError> {
    let address = cfg.address();
    debug!("connecting to agent at {}", address);
    let api = match tokio::time::timeout(cfg.connect_timeout, connector.open(cfg)).await {
        Ok(Ok(api)) => api,
        Ok(Err(e)) => {
            warn!("connect to {} failed: {}", address, e);
            return Err(CtlError::Connection {
                address,
                timeout: cfg.connect_timeout,
                reason: e.to_string(),
            });
        }
        Err(_) => {
            warn!("connect to {} timed out", address);
            return Err(CtlError::Connection {
                address,
                timeout: cfg.connect_timeout,
                reason: "timed out".to_string(),
            });
        }
    };
    debug!("connected to agent at {}", address);

    Ok(Connection {
        address,
        deadline: cfg.request_timeout.map(Deadline::after),
        api,
    })
}

/// One channel to the agent, owned by a single command invocation.
///
/// The channel is released when the connection is dropped, which covers
/// every exit path including unwinding and interrupt.
pub struct Connection {
    address: String,
    deadline: Option<Deadline>,
    api: Box<dyn AgentApi>,
}

impl Connection {
    pub fn api(&self) -> &dyn AgentApi {
        self.api.as_ref()
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Invokes one unary call and checks the status it reports.
    pub async fn call<R, F>(&self, operation: &'static str, fut: F) -> Result<R, CtlError>
    where
        R: ApiReply,
        F: Future<Output = anyhow::Result<R>>,
    {
        let reply = bounded(self.deadline, fut)
            .await
            .map_err(|timeout| CtlError::Request {
                operation,
                reason: RequestFailure::DeadlineExceeded(timeout),
            })?
            .map_err(|e| CtlError::rejected(operation, e))?;
        check_status(operation, &reply)?;
        Ok(reply)
    }

    /// Consumer for one server-streaming call on this connection.
    pub fn stream(&self, operation: &'static str) -> StreamConsumer {
        StreamConsumer::new(operation, self.deadline)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        debug!("releasing connection to {}", self.address);
        self.api.release();
    }
}

pub fn check_status<R: ApiReply>(operation: &'static str, reply: &R) -> Result<(), CtlError> {
    if reply.api_status() == ApiStatus::Ok {
        Ok(())
    } else {
        Err(CtlError::status(operation, reply.api_status(), reply.error_code()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent_rpc::fake::{FakeAgent, FakeConnector, Probe};
    use model::gpu::GpuGetRequest;
    use model::ListResponse;

    fn cfg() -> ClientConfig {
        ClientConfig {
            connect_timeout: Duration::from_secs(1),
            ..ClientConfig::default()
        }
    }

    #[tokio::test]
    async fn hanging_agent_times_out_within_connect_timeout() {
        let started = std::time::Instant::now();
        let err = connect(&FakeConnector::Hang, &cfg()).await.err().unwrap();
        assert!(started.elapsed() < Duration::from_secs(3));
        match err {
            CtlError::Connection { address, timeout, .. } => {
                assert_eq!(address, "127.0.0.1:50061");
                assert_eq!(timeout, Duration::from_secs(1));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn refused_agent_reports_reason() {
        let connector = FakeConnector::Refuse("connection refused".to_string());
        let err = connect(&connector, &cfg()).await.err().unwrap();
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn non_ok_status_is_request_error() {
        let probe = Probe::default();
        let mut agent = FakeAgent::new(&probe);
        agent.gpus = ListResponse::failed(ApiStatus::NotFound);
        let connector = FakeConnector::ready(agent);

        let conn = connect(&connector, &cfg()).await.unwrap();
        let err = conn
            .call("getting GPU", conn.api().gpu_get(GpuGetRequest::default()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CtlError::Request {
                reason: RequestFailure::Status {
                    status: ApiStatus::NotFound,
                    ..
                },
                ..
            }
        ));
        drop(conn);
        assert_eq!(probe.released(), 1);
    }

    #[tokio::test]
    async fn rejected_call_keeps_remote_reason() {
        let probe = Probe::default();
        let mut agent = FakeAgent::new(&probe);
        agent.reject = Some("invalid params".to_string());
        let conn = connect(&FakeConnector::ready(agent), &cfg()).await.unwrap();
        let err = conn
            .call("getting GPU", conn.api().gpu_get(GpuGetRequest::default()))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "getting GPU failed, invalid params");
    }

    #[tokio::test]
    async fn deadline_bounds_calls() {
        let deadline = Some(Deadline::after(Duration::from_millis(20)));
        let res = bounded(deadline, futures::future::pending::<()>()).await;
        assert_eq!(res, Err(Duration::from_millis(20)));
        assert_eq!(bounded(None, async { 3 }).await, Ok(3));
    }
}
