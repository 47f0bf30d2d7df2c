//! In-process transport.
//!
//! Services are plain Rust closures registered on a [`LoopbackNode`]. A
//! request is handled synchronously inside `send`, but the response is still
//! posted to the caller's reactor, so it is only observed once the reactor is
//! driven, exactly as with a network transport.

use std::{
    any::Any,
    collections::HashMap,
    marker::PhantomData,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use parking_lot::RwLock;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use super::{Completion, ServiceFactory, ServiceInvoker};
use crate::{
    Result,
    msg::{ServiceTypeInfo, ZService},
    reactor::ReactorHandle,
};

type Handler<S> = Arc<
    dyn Fn(<S as ZService>::Request) -> Option<<S as ZService>::Response> + Send + Sync,
>;

type Registry = Arc<RwLock<HashMap<String, Box<dyn Any + Send + Sync>>>>;

/// A node whose services live in the same process.
#[derive(Clone)]
pub struct LoopbackNode {
    name: String,
    services: Registry,
    writes: Arc<AtomicUsize>,
}

impl LoopbackNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            services: Default::default(),
            writes: Default::default(),
        }
    }

    /// Serve `service_name`. Returning `None` from `handler` leaves the
    /// request unanswered.
    pub fn serve<S, F>(&self, service_name: &str, handler: F)
    where
        S: ZService + 'static,
        F: Fn(S::Request) -> Option<S::Response> + Send + Sync + 'static,
    {
        let handler: Handler<S> = Arc::new(handler);
        self.services
            .write()
            .insert(service_name.to_string(), Box::new(handler));
        debug!("[LOOPBACK] serving {service_name}");
    }

    /// Stop serving `service_name`; later requests go unanswered.
    pub fn withdraw(&self, service_name: &str) -> bool {
        self.services.write().remove(service_name).is_some()
    }

    /// Number of requests written by invokers of this node.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Acquire)
    }
}

impl ServiceFactory for LoopbackNode {
    fn node_name(&self) -> &str {
        &self.name
    }

    fn create_invoker<S>(
        &self,
        service_name: &str,
        reactor: ReactorHandle,
    ) -> Result<Box<dyn ServiceInvoker<S::Request, S::Response>>>
    where
        S: ZService + ServiceTypeInfo + 'static,
        S::Request: Serialize,
        S::Response: DeserializeOwned,
    {
        Ok(Box::new(LoopbackInvoker::<S> {
            service_name: service_name.to_string(),
            services: self.services.clone(),
            writes: self.writes.clone(),
            reactor,
            _phantom_data: PhantomData,
        }))
    }
}

struct LoopbackInvoker<S> {
    service_name: String,
    services: Registry,
    writes: Arc<AtomicUsize>,
    reactor: ReactorHandle,
    _phantom_data: PhantomData<fn() -> S>,
}

impl<S> ServiceInvoker<S::Request, S::Response> for LoopbackInvoker<S>
where
    S: ZService + 'static,
{
    fn service_name(&self) -> &str {
        &self.service_name
    }

    fn send(&self, request: S::Request, on_complete: Completion<S::Response>) -> Result<()> {
        self.writes.fetch_add(1, Ordering::AcqRel);

        let handler = {
            let services = self.services.read();
            match services.get(&self.service_name) {
                Some(entry) => match entry.downcast_ref::<Handler<S>>() {
                    Some(handler) => Some(handler.clone()),
                    None => {
                        warn!("[LOOPBACK] {}: served with another type", self.service_name);
                        None
                    }
                },
                None => None,
            }
        };

        let Some(handler) = handler else {
            debug!("[LOOPBACK] {}: nobody is serving, request dropped", self.service_name);
            return Ok(());
        };

        match handler(request) {
            Some(response) => {
                self.reactor.post(move || on_complete(Ok(response)));
            }
            None => debug!("[LOOPBACK] {}: handler stayed silent", self.service_name),
        }
        Ok(())
    }
}
