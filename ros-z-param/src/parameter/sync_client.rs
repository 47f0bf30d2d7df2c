//! Blocking client layered over [`AsyncParameterClient`].

use std::{sync::Arc, time::Duration};

use tracing::debug;

use super::client::{AsyncParameterClient, AsyncParameterClientBuilder};
use super::types::{
    ListParametersResult, ParameterDescriptor, ParameterType, ParameterVariant,
    SetParametersResult,
};
use crate::{
    Builder, ParamError, Result,
    future::ParameterFuture,
    reactor::{DriveOutcome, Reactor, SingleThreadedReactor},
    service::ServiceFactory,
};

pub struct SyncParameterClientBuilder<'a, F> {
    factory: &'a F,
    remote_node_name: Option<String>,
    reactor: Option<Arc<dyn Reactor>>,
    timeout: Option<Duration>,
}

impl<'a, F: ServiceFactory> SyncParameterClientBuilder<'a, F> {
    pub fn new(factory: &'a F) -> Self {
        Self {
            factory,
            remote_node_name: None,
            reactor: None,
            timeout: None,
        }
    }

    /// Target node. Defaults to the local node itself.
    pub fn with_remote_node(mut self, name: impl Into<String>) -> Self {
        self.remote_node_name = Some(name.into());
        self
    }

    /// Drive a caller-owned reactor instead of a private one.
    ///
    /// The caller must not invoke this client from a job running on that
    /// reactor, nor drive the reactor from another call on the same thread.
    /// Such calls fail with [`ParamError::ReentrantDrive`]. The reactor has a
    /// single driver at a time: a call made while another thread is driving it
    /// fails with [`ParamError::ReactorBusy`] instead of blocking.
    pub fn with_reactor(mut self, reactor: Arc<dyn Reactor>) -> Self {
        self.reactor = Some(reactor);
        self
    }

    /// Give up on a call after `timeout`. Without one, calls wait until the
    /// reply arrives or the reactor shuts down.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl<F: ServiceFactory> Builder for SyncParameterClientBuilder<'_, F> {
    type Output = SyncParameterClient;

    fn build(self) -> Result<SyncParameterClient> {
        let reactor: Arc<dyn Reactor> = match self.reactor {
            Some(reactor) => reactor,
            None => Arc::new(SingleThreadedReactor::new()),
        };
        let mut builder = AsyncParameterClientBuilder::new(self.factory, reactor.handle());
        if let Some(name) = self.remote_node_name {
            builder = builder.with_remote_node(name);
        }
        Ok(SyncParameterClient {
            client: builder.build()?,
            reactor,
            timeout: self.timeout,
        })
    }
}

/// Blocking counterpart of [`AsyncParameterClient`].
///
/// Each call sends the request through the async client and then drives the
/// reactor on the calling thread until that call's future is ready.
pub struct SyncParameterClient {
    client: AsyncParameterClient,
    reactor: Arc<dyn Reactor>,
    timeout: Option<Duration>,
}

impl SyncParameterClient {
    pub fn async_client(&self) -> &AsyncParameterClient {
        &self.client
    }

    pub fn reactor(&self) -> &Arc<dyn Reactor> {
        &self.reactor
    }

    pub fn remote_node_name(&self) -> &str {
        self.client.remote_node_name()
    }

    pub fn get_parameters<I, S>(&self, names: I) -> Result<Vec<ParameterVariant>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.wait(self.client.get_parameters(names))
    }

    pub fn get_parameter_types<I, S>(&self, names: I) -> Result<Vec<ParameterType>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.wait(self.client.get_parameter_types(names))
    }

    pub fn set_parameters<I>(&self, parameters: I) -> Result<Vec<SetParametersResult>>
    where
        I: IntoIterator<Item = ParameterVariant>,
    {
        self.wait(self.client.set_parameters(parameters))
    }

    pub fn set_parameters_atomically<I>(&self, parameters: I) -> Result<SetParametersResult>
    where
        I: IntoIterator<Item = ParameterVariant>,
    {
        self.wait(self.client.set_parameters_atomically(parameters))
    }

    pub fn list_parameters<I, S>(&self, prefixes: I, depth: u64) -> Result<ListParametersResult>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.wait(self.client.list_parameters(prefixes, depth))
    }

    pub fn describe_parameters<I, S>(&self, names: I) -> Result<Vec<ParameterDescriptor>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.wait(self.client.describe_parameters(names))
    }

    fn wait<T: Clone>(&self, future: ParameterFuture<T>) -> Result<T> {
        if let Some(outcome) = future.try_get() {
            return outcome;
        }

        let outcome = self
            .reactor
            .drive_until(&|| future.is_ready(), self.timeout)?;
        match (outcome, future.try_get()) {
            (_, Some(result)) => result,
            (DriveOutcome::TimedOut, None) => {
                debug!("[PARAM] gave up waiting on '{}'", self.remote_node_name());
                Err(ParamError::Timeout(self.timeout.unwrap_or_default()))
            }
            (_, None) => Err(ParamError::Shutdown),
        }
    }
}
