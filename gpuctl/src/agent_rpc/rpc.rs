use crate::agent_rpc::connection::Connector;
use crate::config::ClientConfig;
use crate::utils::IntoAnyhow;
use anyhow::anyhow;
use async_trait::async_trait;
use futures::StreamExt;
use jsonrpsee::core::client::Subscription;
use jsonrpsee::core::{RpcResult, SubscriptionResult};
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::ws_client::{WsClient, WsClientBuilder};
use log::debug;
use model::event::{Event, EventGenRequest, EventRequest, EventSubscribeRequest};
use model::gpu::{
    Gpu, GpuBadPageResponse, GpuComputePartition, GpuGetRequest, GpuResetRequest, GpuUpdateRequest,
};
use model::gpu_watch::{GpuWatch, GpuWatchIdRequest, GpuWatchRequest};
use model::topo::DeviceTopologyGetResponse;
use model::trace::{TraceGetResponse, TraceRequest};
use model::{ListResponse, StatusResponse, StreamFrame};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Message ceiling in both directions; status and statistics payloads of a
/// fully populated node are large.
pub const MAX_MESSAGE_SIZE: u32 = (i32::MAX - 1) as u32;

/// Transport-level request timeout. Deadlines are enforced per invocation by
/// the connection, so the transport itself only guards against a stuck peer.
const TRANSPORT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60 * 60 * 24 * 365);

#[rpc(client)]
pub trait AgentRpc {
    #[method(name = "Gpu.Get")]
    async fn gpu_get(&self, req: GpuGetRequest) -> RpcResult<ListResponse<Gpu>>;

    #[method(name = "Gpu.Update")]
    async fn gpu_update(&self, req: GpuUpdateRequest) -> RpcResult<StatusResponse>;

    #[method(name = "Gpu.Reset")]
    async fn gpu_reset(&self, req: GpuResetRequest) -> RpcResult<StatusResponse>;

    #[method(name = "Gpu.ComputePartitionGet")]
    async fn gpu_compute_partition_get(
        &self,
        req: GpuGetRequest,
    ) -> RpcResult<ListResponse<GpuComputePartition>>;

    #[subscription(
        name = "DebugGpu.BadPageGet",
        unsubscribe = "DebugGpu.BadPageCancel",
        item = StreamFrame<GpuBadPageResponse>
    )]
    async fn gpu_bad_page_get(&self, req: GpuGetRequest) -> SubscriptionResult;

    #[method(name = "Event.Get")]
    async fn event_get(&self, req: EventRequest) -> RpcResult<ListResponse<Event>>;

    #[subscription(
        name = "Event.Subscribe",
        unsubscribe = "Event.Unsubscribe",
        item = StreamFrame<Event>
    )]
    async fn event_subscribe(&self, req: EventSubscribeRequest) -> SubscriptionResult;

    #[method(name = "DebugEvent.Gen")]
    async fn event_gen(&self, req: EventGenRequest) -> RpcResult<StatusResponse>;

    #[method(name = "GpuWatch.Create")]
    async fn gpu_watch_create(&self, req: GpuWatchRequest) -> RpcResult<StatusResponse>;

    #[method(name = "GpuWatch.Delete")]
    async fn gpu_watch_delete(&self, req: GpuWatchIdRequest) -> RpcResult<StatusResponse>;

    #[method(name = "GpuWatch.Get")]
    async fn gpu_watch_get(&self, req: GpuWatchIdRequest) -> RpcResult<ListResponse<GpuWatch>>;

    #[subscription(
        name = "GpuWatch.Subscribe",
        unsubscribe = "GpuWatch.Unsubscribe",
        item = StreamFrame<GpuWatch>
    )]
    async fn gpu_watch_subscribe(&self, req: GpuWatchIdRequest) -> SubscriptionResult;

    #[method(name = "Topo.DeviceTopologyGet")]
    async fn device_topology_get(&self) -> RpcResult<DeviceTopologyGetResponse>;

    #[method(name = "Debug.TraceGet")]
    async fn trace_get(&self) -> RpcResult<TraceGetResponse>;

    #[method(name = "Debug.TraceUpdate")]
    async fn trace_update(&self, req: TraceRequest) -> RpcResult<StatusResponse>;

    #[method(name = "Debug.TraceFlush")]
    async fn trace_flush(&self) -> RpcResult<StatusResponse>;
}

/// Receive side of one server-streaming call.
///
/// `Ok(None)` is the explicit end-of-stream; every other way the stream can
/// stop is an error. Dropping the handle cancels the call.
#[async_trait]
pub trait RecordStream<T: Send>: Send {
    async fn recv(&mut self) -> anyhow::Result<Option<T>>;
}

pub type BoxRecordStream<T> = Box<dyn RecordStream<T>>;

/// Agent calls as seen by the commands, with transport errors flattened to
/// anyhow. `release` closes the underlying channel and is invoked exactly
/// once, by the owning connection.
#[async_trait]
pub trait AgentApi: Send + Sync {
    async fn gpu_get(&self, req: GpuGetRequest) -> anyhow::Result<ListResponse<Gpu>>;

    async fn gpu_update(&self, req: GpuUpdateRequest) -> anyhow::Result<StatusResponse>;

    async fn gpu_reset(&self, req: GpuResetRequest) -> anyhow::Result<StatusResponse>;

    async fn gpu_compute_partition_get(
        &self,
        req: GpuGetRequest,
    ) -> anyhow::Result<ListResponse<GpuComputePartition>>;

    async fn gpu_bad_page_get(
        &self,
        req: GpuGetRequest,
    ) -> anyhow::Result<BoxRecordStream<GpuBadPageResponse>>;

    async fn event_get(&self, req: EventRequest) -> anyhow::Result<ListResponse<Event>>;

    async fn event_subscribe(
        &self,
        req: EventSubscribeRequest,
    ) -> anyhow::Result<BoxRecordStream<Event>>;

    async fn event_gen(&self, req: EventGenRequest) -> anyhow::Result<StatusResponse>;

    async fn gpu_watch_create(&self, req: GpuWatchRequest) -> anyhow::Result<StatusResponse>;

    async fn gpu_watch_delete(&self, req: GpuWatchIdRequest) -> anyhow::Result<StatusResponse>;

    async fn gpu_watch_get(&self, req: GpuWatchIdRequest) -> anyhow::Result<ListResponse<GpuWatch>>;

    async fn gpu_watch_subscribe(
        &self,
        req: GpuWatchIdRequest,
    ) -> anyhow::Result<BoxRecordStream<GpuWatch>>;

    async fn device_topology_get(&self) -> anyhow::Result<DeviceTopologyGetResponse>;

    async fn trace_get(&self) -> anyhow::Result<TraceGetResponse>;

    async fn trace_update(&self, req: TraceRequest) -> anyhow::Result<StatusResponse>;

    async fn trace_flush(&self) -> anyhow::Result<StatusResponse>;

    fn release(&mut self);
}

/// Adapts a jsonrpsee subscription carrying [`StreamFrame`]s.
pub struct SubscriptionStream<T> {
    sub: Subscription<StreamFrame<T>>,
    ended: bool,
}

impl<T> SubscriptionStream<T> {
    pub fn new(sub: Subscription<StreamFrame<T>>) -> Self {
        Self { sub, ended: false }
    }
}

#[async_trait]
impl<T> RecordStream<T> for SubscriptionStream<T>
where
    T: DeserializeOwned + Send + Unpin + 'static,
{
    async fn recv(&mut self) -> anyhow::Result<Option<T>> {
        if self.ended {
            return Ok(None);
        }
        match self.sub.next().await {
            Some(Ok(StreamFrame::Record(record))) => Ok(Some(record)),
            Some(Ok(StreamFrame::End)) => {
                self.ended = true;
                Ok(None)
            }
            Some(Err(e)) => Err(anyhow!("{}", e)),
            None => Err(anyhow!("subscription closed before end of stream")),
        }
    }
}

/// WrapClient for rpc error, convert RpcResult to anyhow Result
pub struct WrapClient {
    client: Option<WsClient>,
}

impl WrapClient {
    fn client(&self) -> anyhow::Result<&WsClient> {
        self.client
            .as_ref()
            .ok_or_else(|| anyhow!("agent channel already released"))
    }
}

#[async_trait]
impl AgentApi for WrapClient {
    async fn gpu_get(&self, req: GpuGetRequest) -> anyhow::Result<ListResponse<Gpu>> {
        self.client()?.gpu_get(req).await.anyhow()
    }

    async fn gpu_update(&self, req: GpuUpdateRequest) -> anyhow::Result<StatusResponse> {
        self.client()?.gpu_update(req).await.anyhow()
    }

    async fn gpu_reset(&self, req: GpuResetRequest) -> anyhow::Result<StatusResponse> {
        self.client()?.gpu_reset(req).await.anyhow()
    }

    async fn gpu_compute_partition_get(
        &self,
        req: GpuGetRequest,
    ) -> anyhow::Result<ListResponse<GpuComputePartition>> {
        self.client()?.gpu_compute_partition_get(req).await.anyhow()
    }

    async fn gpu_bad_page_get(
        &self,
        req: GpuGetRequest,
    ) -> anyhow::Result<BoxRecordStream<GpuBadPageResponse>> {
        let sub = self.client()?.gpu_bad_page_get(req).await.anyhow()?;
        Ok(Box::new(SubscriptionStream::new(sub)))
    }

    async fn event_get(&self, req: EventRequest) -> anyhow::Result<ListResponse<Event>> {
        self.client()?.event_get(req).await.anyhow()
    }

    async fn event_subscribe(
        &self,
        req: EventSubscribeRequest,
    ) -> anyhow::Result<BoxRecordStream<Event>> {
        let sub = self.client()?.event_subscribe(req).await.anyhow()?;
        Ok(Box::new(SubscriptionStream::new(sub)))
    }

    async fn event_gen(&self, req: EventGenRequest) -> anyhow::Result<StatusResponse> {
        self.client()?.event_gen(req).await.anyhow()
    }

    async fn gpu_watch_create(&self, req: GpuWatchRequest) -> anyhow::Result<StatusResponse> {
        self.client()?.gpu_watch_create(req).await.anyhow()
    }

    async fn gpu_watch_delete(&self, req: GpuWatchIdRequest) -> anyhow::Result<StatusResponse> {
        self.client()?.gpu_watch_delete(req).await.anyhow()
    }

    async fn gpu_watch_get(&self, req: GpuWatchIdRequest) -> anyhow::Result<ListResponse<GpuWatch>> {
        self.client()?.gpu_watch_get(req).await.anyhow()
    }

    async fn gpu_watch_subscribe(
        &self,
        req: GpuWatchIdRequest,
    ) -> anyhow::Result<BoxRecordStream<GpuWatch>> {
        let sub = self.client()?.gpu_watch_subscribe(req).await.anyhow()?;
        Ok(Box::new(SubscriptionStream::new(sub)))
    }

    async fn device_topology_get(&self) -> anyhow::Result<DeviceTopologyGetResponse> {
        self.client()?.device_topology_get().await.anyhow()
    }

    async fn trace_get(&self) -> anyhow::Result<TraceGetResponse> {
        self.client()?.trace_get().await.anyhow()
    }

    async fn trace_update(&self, req: TraceRequest) -> anyhow::Result<StatusResponse> {
        self.client()?.trace_update(req).await.anyhow()
    }

    async fn trace_flush(&self) -> anyhow::Result<StatusResponse> {
        self.client()?.trace_flush().await.anyhow()
    }

    fn release(&mut self) {
        if let Some(client) = self.client.take() {
            debug!("closing agent channel");
            drop(client);
        }
    }
}

/// Opens JSON-RPC channels over WebSocket.
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn open(&self, cfg: &ClientConfig) -> anyhow::Result<Box<dyn AgentApi>> {
        let client = WsClientBuilder::default()
            .max_request_size(MAX_MESSAGE_SIZE)
            .max_response_size(MAX_MESSAGE_SIZE)
            .connection_timeout(cfg.connect_timeout)
            .request_timeout(TRANSPORT_REQUEST_TIMEOUT)
            .build(cfg.url())
            .await
            .anyhow()?;
        Ok(Box::new(WrapClient {
            client: Some(client),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent_rpc::connection::connect;
    use crate::error::CtlError;

    #[test]
    fn message_ceiling_is_transport_maximum() {
        assert_eq!(MAX_MESSAGE_SIZE, 2_147_483_646);
    }

    #[tokio::test]
    async fn unreachable_agent_is_connection_error() {
        // port 1 on loopback refuses immediately on any sane host
        let cfg = ClientConfig {
            port: 1,
            connect_timeout: Duration::from_secs(2),
            ..ClientConfig::default()
        };
        let err = connect(&WsConnector, &cfg).await.err().unwrap();
        match err {
            CtlError::Connection { address, .. } => assert_eq!(address, "127.0.0.1:1"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
