//! In-process agent used by the command tests.

use crate::agent_rpc::connection::Connector;
use crate::agent_rpc::rpc::{AgentApi, BoxRecordStream, RecordStream};
use crate::config::ClientConfig;
use anyhow::anyhow;
use async_trait::async_trait;
use model::event::{Event, EventGenRequest, EventRequest, EventSubscribeRequest};
use model::gpu::{
    Gpu, GpuBadPageResponse, GpuComputePartition, GpuGetRequest, GpuResetRequest, GpuUpdateRequest,
};
use model::gpu_watch::{GpuWatch, GpuWatchIdRequest, GpuWatchRequest};
use model::topo::DeviceTopologyGetResponse;
use model::trace::{TraceGetResponse, TraceRequest};
use model::{ListResponse, StatusResponse};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Shared counters observed by the tests after the agent is gone.
#[derive(Clone, Default)]
pub struct Probe {
    released: Arc<AtomicUsize>,
    streams_closed: Arc<AtomicUsize>,
    calls: Arc<Mutex<Vec<(String, serde_json::Value)>>>,
}

impl Probe {
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn streams_closed(&self) -> usize {
        self.streams_closed.load(Ordering::SeqCst)
    }

    /// Method names in call order.
    pub fn methods(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(m, _)| m.clone()).collect()
    }

    /// JSON of the last request sent with `method`.
    pub fn request(&self, method: &str) -> Option<serde_json::Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(m, _)| m == method)
            .map(|(_, v)| v.clone())
    }

    fn record<R: Serialize>(&self, method: &str, req: &R) {
        let value = serde_json::to_value(req).unwrap();
        self.calls.lock().unwrap().push((method.to_string(), value));
    }
}

/// How a fake stream ends once its records are exhausted.
#[derive(Clone, Debug)]
pub enum Tail {
    End,
    Error(String),
    Pending,
}

pub struct FakeStream<T> {
    records: VecDeque<T>,
    tail: Tail,
    closed: Arc<AtomicUsize>,
}

impl<T> FakeStream<T> {
    pub fn new(probe: &Probe, records: Vec<T>, tail: Tail) -> Self {
        Self {
            records: records.into(),
            tail,
            closed: probe.streams_closed.clone(),
        }
    }
}

#[async_trait]
impl<T: Send> RecordStream<T> for FakeStream<T> {
    async fn recv(&mut self) -> anyhow::Result<Option<T>> {
        if let Some(record) = self.records.pop_front() {
            return Ok(Some(record));
        }
        match &self.tail {
            Tail::End => Ok(None),
            Tail::Error(e) => Err(anyhow!("{}", e)),
            Tail::Pending => futures::future::pending().await,
        }
    }
}

impl<T> Drop for FakeStream<T> {
    fn drop(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Canned agent. Every unary call answers with the matching field, every
/// stream replays its records and then ends as its tail says.
pub struct FakeAgent {
    probe: Probe,
    pub reject: Option<String>,
    pub status: StatusResponse,
    pub gpus: ListResponse<Gpu>,
    pub partitions: ListResponse<GpuComputePartition>,
    pub bad_pages: Vec<GpuBadPageResponse>,
    pub events: ListResponse<Event>,
    pub event_stream: Vec<Event>,
    pub watches: ListResponse<GpuWatch>,
    pub watch_stream: Vec<GpuWatch>,
    pub topology: DeviceTopologyGetResponse,
    pub trace: TraceGetResponse,
    pub tail: Tail,
}

impl FakeAgent {
    pub fn new(probe: &Probe) -> Self {
        Self {
            probe: probe.clone(),
            reject: None,
            status: StatusResponse::default(),
            gpus: ListResponse::ok(vec![]),
            partitions: ListResponse::ok(vec![]),
            bad_pages: vec![],
            events: ListResponse::ok(vec![]),
            event_stream: vec![],
            watches: ListResponse::ok(vec![]),
            watch_stream: vec![],
            topology: DeviceTopologyGetResponse::default(),
            trace: TraceGetResponse::default(),
            tail: Tail::End,
        }
    }

    fn answer<R: Serialize, T: Clone>(&self, method: &str, req: &R, reply: &T) -> anyhow::Result<T> {
        self.probe.record(method, req);
        match &self.reject {
            Some(reason) => Err(anyhow!("{}", reason)),
            None => Ok(reply.clone()),
        }
    }

    fn open<R: Serialize, T: Clone + Send + 'static>(
        &self,
        method: &str,
        req: &R,
        records: &[T],
    ) -> anyhow::Result<BoxRecordStream<T>> {
        self.probe.record(method, req);
        if let Some(reason) = &self.reject {
            return Err(anyhow!("{}", reason));
        }
        Ok(Box::new(FakeStream::new(&self.probe, records.to_vec(), self.tail.clone())))
    }
}

#[async_trait]
impl AgentApi for FakeAgent {
    async fn gpu_get(&self, req: GpuGetRequest) -> anyhow::Result<ListResponse<Gpu>> {
        self.answer("Gpu.Get", &req, &self.gpus)
    }

    async fn gpu_update(&self, req: GpuUpdateRequest) -> anyhow::Result<StatusResponse> {
        self.answer("Gpu.Update", &req, &self.status)
    }

    async fn gpu_reset(&self, req: GpuResetRequest) -> anyhow::Result<StatusResponse> {
        self.answer("Gpu.Reset", &req, &self.status)
    }

    async fn gpu_compute_partition_get(
        &self,
        req: GpuGetRequest,
    ) -> anyhow::Result<ListResponse<GpuComputePartition>> {
        self.answer("Gpu.ComputePartitionGet", &req, &self.partitions)
    }

    async fn gpu_bad_page_get(
        &self,
        req: GpuGetRequest,
    ) -> anyhow::Result<BoxRecordStream<GpuBadPageResponse>> {
        self.open("DebugGpu.BadPageGet", &req, &self.bad_pages)
    }

    async fn event_get(&self, req: EventRequest) -> anyhow::Result<ListResponse<Event>> {
        self.answer("Event.Get", &req, &self.events)
    }

    async fn event_subscribe(
        &self,
        req: EventSubscribeRequest,
    ) -> anyhow::Result<BoxRecordStream<Event>> {
        self.open("Event.Subscribe", &req, &self.event_stream)
    }

    async fn event_gen(&self, req: EventGenRequest) -> anyhow::Result<StatusResponse> {
        self.answer("DebugEvent.Gen", &req, &self.status)
    }

    async fn gpu_watch_create(&self, req: GpuWatchRequest) -> anyhow::Result<StatusResponse> {
        self.answer("GpuWatch.Create", &req, &self.status)
    }

    async fn gpu_watch_delete(&self, req: GpuWatchIdRequest) -> anyhow::Result<StatusResponse> {
        self.answer("GpuWatch.Delete", &req, &self.status)
    }

    async fn gpu_watch_get(&self, req: GpuWatchIdRequest) -> anyhow::Result<ListResponse<GpuWatch>> {
        self.answer("GpuWatch.Get", &req, &self.watches)
    }

    async fn gpu_watch_subscribe(
        &self,
        req: GpuWatchIdRequest,
    ) -> anyhow::Result<BoxRecordStream<GpuWatch>> {
        self.open("GpuWatch.Subscribe", &req, &self.watch_stream)
    }

    async fn device_topology_get(&self) -> anyhow::Result<DeviceTopologyGetResponse> {
        self.answer("Topo.DeviceTopologyGet", &(), &self.topology)
    }

    async fn trace_get(&self) -> anyhow::Result<TraceGetResponse> {
        self.answer("Debug.TraceGet", &(), &self.trace)
    }

    async fn trace_update(&self, req: TraceRequest) -> anyhow::Result<StatusResponse> {
        self.answer("Debug.TraceUpdate", &req, &self.status)
    }

    async fn trace_flush(&self) -> anyhow::Result<StatusResponse> {
        self.answer("Debug.TraceFlush", &(), &self.status)
    }

    fn release(&mut self) {
        self.probe.released.fetch_add(1, Ordering::SeqCst);
    }
}

pub enum FakeConnector {
    Ready(Mutex<Option<FakeAgent>>),
    Refuse(String),
    Hang,
}

impl FakeConnector {
    pub fn ready(agent: FakeAgent) -> Self {
        FakeConnector::Ready(Mutex::new(Some(agent)))
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn open(&self, _cfg: &ClientConfig) -> anyhow::Result<Box<dyn AgentApi>> {
        match self {
            FakeConnector::Ready(agent) => {
                let agent = agent
                    .lock()
                    .unwrap()
                    .take()
                    .ok_or_else(|| anyhow!("fake agent already handed out"))?;
                Ok(Box::new(agent))
            }
            FakeConnector::Refuse(reason) => Err(anyhow!("{}", reason)),
            FakeConnector::Hang => futures::future::pending().await,
        }
    }
}
