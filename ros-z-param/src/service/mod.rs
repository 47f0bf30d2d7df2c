//! Client-side service plumbing.
//!
//! A [`ServiceInvoker`] is bound to one named remote operation. It writes a
//! request and arranges for a one-shot completion to run later on a
//! [`Reactor`](crate::reactor::Reactor). A [`ServiceFactory`] creates invokers;
//! [`ZNode`](crate::node::ZNode) does so over Zenoh and [`LoopbackNode`] in
//! process.

use std::{
    marker::PhantomData,
    sync::{Arc, atomic::AtomicUsize},
};

use parking_lot::Mutex;
use serde::{Serialize, de::DeserializeOwned};
use std::sync::atomic::Ordering::AcqRel;
use tracing::{debug, warn};
use zenoh::{Session, Wait};

use crate::{
    Builder, ParamError, Result,
    attachment::{Attachment, GidArray},
    entity::EndpointEntity,
    msg::{CdrSerdes, ServiceTypeInfo, ZDeserializer, ZSerializer, ZService},
    reactor::ReactorHandle,
};

pub mod loopback;

pub use loopback::LoopbackNode;

/// One-shot continuation receiving the raw response of a single request.
pub type Completion<Resp> = Box<dyn FnOnce(Result<Resp>) + Send + 'static>;

/// Handle bound to one named remote operation.
pub trait ServiceInvoker<Req, Resp>: Send + Sync {
    /// Fully resolved name of the remote operation.
    fn service_name(&self) -> &str;

    /// Write `request` and return without waiting.
    ///
    /// `on_complete` runs at most once, on the reactor's thread, when the
    /// response arrives. If the remote never answers it never runs. An error
    /// here means nothing was written and `on_complete` has been dropped.
    fn send(&self, request: Req, on_complete: Completion<Resp>) -> Result<()>;
}

/// Creates invokers for named services.
pub trait ServiceFactory {
    /// Name of the local node; the default target of parameter clients.
    fn node_name(&self) -> &str;

    fn create_invoker<S>(
        &self,
        service_name: &str,
        reactor: ReactorHandle,
    ) -> Result<Box<dyn ServiceInvoker<S::Request, S::Response>>>
    where
        S: ZService + ServiceTypeInfo + 'static,
        S::Request: Serialize,
        S::Response: DeserializeOwned;
}

#[derive(Debug)]
pub struct ZClientBuilder<S> {
    pub entity: EndpointEntity,
    pub session: Arc<Session>,
    pub reactor: Option<ReactorHandle>,
    pub _phantom_data: PhantomData<fn() -> S>,
}

impl<S> ZClientBuilder<S> {
    /// Reactor that completions are posted to.
    pub fn with_reactor(mut self, reactor: ReactorHandle) -> Self {
        self.reactor = Some(reactor);
        self
    }
}

/// Service client over a Zenoh querier.
pub struct ZClient<S: ZService> {
    service_name: String,
    // Sequence numbers start at 1 for ROS compatibility
    sn: AtomicUsize,
    gid: GidArray,
    inner: zenoh::query::Querier<'static>,
    reactor: ReactorHandle,
    _phantom_data: PhantomData<fn() -> S>,
}

impl<S> Builder for ZClientBuilder<S>
where
    S: ZService,
{
    type Output = ZClient<S>;

    fn build(self) -> Result<Self::Output> {
        let reactor = self.reactor.ok_or_else(|| {
            ParamError::Construction(format!("no reactor for client '{}'", self.entity.topic))
        })?;
        let key_expr = self.entity.topic_key_expr()?;
        debug!("[CLN] KE: {key_expr}");

        let inner = self
            .session
            .declare_querier(key_expr)
            .wait()
            .map_err(|e| ParamError::Construction(e.to_string()))?;
        Ok(ZClient {
            service_name: self.entity.topic.clone(),
            sn: AtomicUsize::new(1),
            gid: self.entity.gid(),
            inner,
            reactor,
            _phantom_data: Default::default(),
        })
    }
}

impl<S> ZClient<S>
where
    S: ZService,
{
    fn new_attachment(&self) -> Attachment {
        Attachment::new(self.sn.fetch_add(1, AcqRel) as _, self.gid)
    }
}

impl<S> ServiceInvoker<S::Request, S::Response> for ZClient<S>
where
    S: ZService + 'static,
    S::Request: Serialize,
    S::Response: DeserializeOwned,
{
    fn service_name(&self) -> &str {
        &self.service_name
    }

    fn send(&self, request: S::Request, on_complete: Completion<S::Response>) -> Result<()> {
        let payload = CdrSerdes::<S::Request>::serialize(&request)?;
        let attachment = self.new_attachment();
        let sn = attachment.sequence_number;

        // Zenoh may deliver several replies; only the first one completes the call.
        let slot = Arc::new(Mutex::new(Some(on_complete)));
        let reactor = self.reactor.clone();
        let service = self.service_name.clone();

        self.inner
            .get()
            .payload(payload)
            .attachment(attachment)
            .callback(move |reply| {
                let Some(on_complete) = slot.lock().take() else {
                    debug!("[CLN] {service}: ignoring extra reply to request {sn}");
                    return;
                };
                let outcome = match reply.into_result() {
                    Ok(sample) => {
                        let bytes = sample.payload().to_bytes();
                        CdrSerdes::<S::Response>::deserialize(&*bytes)
                    }
                    Err(err) => Err(ParamError::Remote(
                        String::from_utf8_lossy(&err.payload().to_bytes()).into_owned(),
                    )),
                };
                if let Err(e) = &outcome {
                    warn!("[CLN] {service}: request {sn} failed: {e}");
                }
                if !reactor.post(move || on_complete(outcome)) {
                    debug!("[CLN] {service}: reactor is shut down, dropping reply to {sn}");
                }
            })
            .wait()?;

        debug!("[CLN] {}: sent request {sn}", self.service_name);
        Ok(())
    }
}
