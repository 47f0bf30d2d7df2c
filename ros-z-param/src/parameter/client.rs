//! Non-blocking client for the parameter services of a remote node.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::types::{
    ListParametersResult, ParameterDescriptor, ParameterType, ParameterValue, ParameterVariant,
    SetParametersResult,
};
use super::wire::{
    DescribeParametersRequest, DescribeParametersResponse, DescribeParametersSrv,
    GetParameterTypesRequest, GetParameterTypesResponse, GetParameterTypesSrv,
    GetParametersRequest, GetParametersResponse, GetParametersSrv, ListParametersRequest,
    ListParametersResponse, ListParametersSrv, SetParametersAtomicallyRequest,
    SetParametersAtomicallyResponse, SetParametersAtomicallySrv, SetParametersRequest,
    SetParametersResponse, SetParametersSrv,
};
use crate::{
    Builder, ParamError, Result,
    future::{self, ParameterFuture, ParameterPromise},
    pending::{PendingCall, PendingCallRegistry, RequestId},
    reactor::ReactorHandle,
    service::{Completion, ServiceFactory, ServiceInvoker},
};

/// Continuation invoked with the ready future once a call completes.
pub type ParameterCallback<T> = Box<dyn FnOnce(ParameterFuture<T>) + Send + 'static>;

pub struct AsyncParameterClientBuilder<'a, F> {
    factory: &'a F,
    reactor: ReactorHandle,
    remote_node_name: Option<String>,
}

impl<'a, F: ServiceFactory> AsyncParameterClientBuilder<'a, F> {
    /// Completions are posted to `reactor`; the client only makes progress
    /// while that reactor is driven.
    pub fn new(factory: &'a F, reactor: ReactorHandle) -> Self {
        Self {
            factory,
            reactor,
            remote_node_name: None,
        }
    }

    /// Target node. Defaults to the local node itself.
    pub fn with_remote_node(mut self, name: impl Into<String>) -> Self {
        self.remote_node_name = Some(name.into());
        self
    }
}

impl<F: ServiceFactory> Builder for AsyncParameterClientBuilder<'_, F> {
    type Output = AsyncParameterClient;

    fn build(self) -> Result<AsyncParameterClient> {
        let remote = match self.remote_node_name {
            Some(name) if !name.is_empty() => name,
            _ => self.factory.node_name().to_string(),
        };
        if remote.is_empty() {
            return Err(ParamError::Construction(
                "remote node name could not be resolved".to_string(),
            ));
        }

        let reactor = self.reactor;
        let factory = self.factory;
        let client = AsyncParameterClient {
            get_parameters: factory.create_invoker::<GetParametersSrv>(
                &format!("{remote}{}", GetParametersSrv::SUFFIX),
                reactor.clone(),
            )?,
            get_parameter_types: factory.create_invoker::<GetParameterTypesSrv>(
                &format!("{remote}{}", GetParameterTypesSrv::SUFFIX),
                reactor.clone(),
            )?,
            set_parameters: factory.create_invoker::<SetParametersSrv>(
                &format!("{remote}{}", SetParametersSrv::SUFFIX),
                reactor.clone(),
            )?,
            set_parameters_atomically: factory.create_invoker::<SetParametersAtomicallySrv>(
                &format!("{remote}{}", SetParametersAtomicallySrv::SUFFIX),
                reactor.clone(),
            )?,
            list_parameters: factory.create_invoker::<ListParametersSrv>(
                &format!("{remote}{}", ListParametersSrv::SUFFIX),
                reactor.clone(),
            )?,
            describe_parameters: factory.create_invoker::<DescribeParametersSrv>(
                &format!("{remote}{}", DescribeParametersSrv::SUFFIX),
                reactor,
            )?,
            pending: Arc::new(PendingCallRegistry::new()),
            remote_node_name: remote,
        };
        debug!(
            "[PARAM] parameter client for '{}' ready",
            client.remote_node_name
        );
        Ok(client)
    }
}

/// Reads and writes the parameters of one remote node without blocking.
///
/// Every operation returns a [`ParameterFuture`] immediately. The `_with_callback`
/// variants additionally run a continuation with the ready future, on the
/// reactor's thread.
///
/// Calls that need no transport write (an empty name list) or whose request
/// cannot be written resolve before the method returns, and their callback runs
/// on the calling thread.
pub struct AsyncParameterClient {
    remote_node_name: String,
    pending: Arc<PendingCallRegistry>,
    get_parameters: Box<dyn ServiceInvoker<GetParametersRequest, GetParametersResponse>>,
    get_parameter_types:
        Box<dyn ServiceInvoker<GetParameterTypesRequest, GetParameterTypesResponse>>,
    set_parameters: Box<dyn ServiceInvoker<SetParametersRequest, SetParametersResponse>>,
    set_parameters_atomically:
        Box<dyn ServiceInvoker<SetParametersAtomicallyRequest, SetParametersAtomicallyResponse>>,
    list_parameters: Box<dyn ServiceInvoker<ListParametersRequest, ListParametersResponse>>,
    describe_parameters:
        Box<dyn ServiceInvoker<DescribeParametersRequest, DescribeParametersResponse>>,
}

impl AsyncParameterClient {
    pub fn remote_node_name(&self) -> &str {
        &self.remote_node_name
    }

    /// Calls sent but not yet answered, oldest first.
    pub fn outstanding_calls(&self) -> Vec<PendingCall> {
        self.pending.snapshot()
    }

    // ── get_parameters ───────────────────────────────────────────────────────

    /// Values of `names`, one [`ParameterVariant`] per name in request order.
    pub fn get_parameters<I, S>(&self, names: I) -> ParameterFuture<Vec<ParameterVariant>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.get_parameters_impl(collect_names(names), None)
    }

    pub fn get_parameters_with_callback<I, S, C>(
        &self,
        names: I,
        callback: C,
    ) -> ParameterFuture<Vec<ParameterVariant>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        C: FnOnce(ParameterFuture<Vec<ParameterVariant>>) + Send + 'static,
    {
        self.get_parameters_impl(collect_names(names), Some(Box::new(callback)))
    }

    fn get_parameters_impl(
        &self,
        names: Vec<String>,
        callback: Option<ParameterCallback<Vec<ParameterVariant>>>,
    ) -> ParameterFuture<Vec<ParameterVariant>> {
        if names.is_empty() {
            return resolved(Ok(Vec::new()), callback);
        }
        let request = GetParametersRequest {
            names: names.clone(),
        };
        self.call(
            self.get_parameters.as_ref(),
            "get_parameters",
            request,
            move |response| {
                check_shape("get_parameters", names.len(), response.values.len())?;
                Ok(names
                    .into_iter()
                    .zip(response.values)
                    .map(|(name, value)| ParameterVariant {
                        name,
                        value: ParameterValue::from_wire(value),
                    })
                    .collect())
            },
            callback,
        )
    }

    // ── get_parameter_types ──────────────────────────────────────────────────

    /// Types of `names`, in request order. Unknown type codes decode to `NotSet`.
    pub fn get_parameter_types<I, S>(&self, names: I) -> ParameterFuture<Vec<ParameterType>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.get_parameter_types_impl(collect_names(names), None)
    }

    pub fn get_parameter_types_with_callback<I, S, C>(
        &self,
        names: I,
        callback: C,
    ) -> ParameterFuture<Vec<ParameterType>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        C: FnOnce(ParameterFuture<Vec<ParameterType>>) + Send + 'static,
    {
        self.get_parameter_types_impl(collect_names(names), Some(Box::new(callback)))
    }

    fn get_parameter_types_impl(
        &self,
        names: Vec<String>,
        callback: Option<ParameterCallback<Vec<ParameterType>>>,
    ) -> ParameterFuture<Vec<ParameterType>> {
        if names.is_empty() {
            return resolved(Ok(Vec::new()), callback);
        }
        let expected = names.len();
        self.call(
            self.get_parameter_types.as_ref(),
            "get_parameter_types",
            GetParameterTypesRequest { names },
            move |response| {
                check_shape("get_parameter_types", expected, response.types.len())?;
                Ok(response
                    .types
                    .into_iter()
                    .map(ParameterType::from_u8)
                    .collect())
            },
            callback,
        )
    }

    // ── set_parameters ───────────────────────────────────────────────────────

    /// Set each entry independently. One result per entry, in order; some may
    /// succeed while others fail.
    pub fn set_parameters<I>(&self, parameters: I) -> ParameterFuture<Vec<SetParametersResult>>
    where
        I: IntoIterator<Item = ParameterVariant>,
    {
        self.set_parameters_impl(parameters.into_iter().collect(), None)
    }

    pub fn set_parameters_with_callback<I, C>(
        &self,
        parameters: I,
        callback: C,
    ) -> ParameterFuture<Vec<SetParametersResult>>
    where
        I: IntoIterator<Item = ParameterVariant>,
        C: FnOnce(ParameterFuture<Vec<SetParametersResult>>) + Send + 'static,
    {
        self.set_parameters_impl(parameters.into_iter().collect(), Some(Box::new(callback)))
    }

    fn set_parameters_impl(
        &self,
        parameters: Vec<ParameterVariant>,
        callback: Option<ParameterCallback<Vec<SetParametersResult>>>,
    ) -> ParameterFuture<Vec<SetParametersResult>> {
        if parameters.is_empty() {
            return resolved(Ok(Vec::new()), callback);
        }
        let expected = parameters.len();
        let request = SetParametersRequest {
            parameters: parameters.iter().map(ParameterVariant::to_wire).collect(),
        };
        self.call(
            self.set_parameters.as_ref(),
            "set_parameters",
            request,
            move |response| {
                check_shape("set_parameters", expected, response.results.len())?;
                Ok(response
                    .results
                    .into_iter()
                    .map(SetParametersResult::from_wire)
                    .collect())
            },
            callback,
        )
    }

    // ── set_parameters_atomically ────────────────────────────────────────────

    /// Set all entries or none. The remote node guarantees atomicity; the
    /// aggregate result is reported as received.
    pub fn set_parameters_atomically<I>(&self, parameters: I) -> ParameterFuture<SetParametersResult>
    where
        I: IntoIterator<Item = ParameterVariant>,
    {
        self.set_parameters_atomically_impl(parameters.into_iter().collect(), None)
    }

    pub fn set_parameters_atomically_with_callback<I, C>(
        &self,
        parameters: I,
        callback: C,
    ) -> ParameterFuture<SetParametersResult>
    where
        I: IntoIterator<Item = ParameterVariant>,
        C: FnOnce(ParameterFuture<SetParametersResult>) + Send + 'static,
    {
        self.set_parameters_atomically_impl(
            parameters.into_iter().collect(),
            Some(Box::new(callback)),
        )
    }

    fn set_parameters_atomically_impl(
        &self,
        parameters: Vec<ParameterVariant>,
        callback: Option<ParameterCallback<SetParametersResult>>,
    ) -> ParameterFuture<SetParametersResult> {
        let request = SetParametersAtomicallyRequest {
            parameters: parameters.iter().map(ParameterVariant::to_wire).collect(),
        };
        self.call(
            self.set_parameters_atomically.as_ref(),
            "set_parameters_atomically",
            request,
            |response| Ok(SetParametersResult::from_wire(response.result)),
            callback,
        )
    }

    // ── list_parameters ──────────────────────────────────────────────────────

    /// Names under `prefixes` (all names if empty), at most `depth` levels
    /// below each prefix. A depth of 0 means no limit.
    pub fn list_parameters<I, S>(&self, prefixes: I, depth: u64) -> ParameterFuture<ListParametersResult>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.list_parameters_impl(collect_names(prefixes), depth, None)
    }

    pub fn list_parameters_with_callback<I, S, C>(
        &self,
        prefixes: I,
        depth: u64,
        callback: C,
    ) -> ParameterFuture<ListParametersResult>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        C: FnOnce(ParameterFuture<ListParametersResult>) + Send + 'static,
    {
        self.list_parameters_impl(collect_names(prefixes), depth, Some(Box::new(callback)))
    }

    fn list_parameters_impl(
        &self,
        prefixes: Vec<String>,
        depth: u64,
        callback: Option<ParameterCallback<ListParametersResult>>,
    ) -> ParameterFuture<ListParametersResult> {
        self.call(
            self.list_parameters.as_ref(),
            "list_parameters",
            ListParametersRequest { prefixes, depth },
            |response| Ok(ListParametersResult::from_wire(response.result)),
            callback,
        )
    }

    // ── describe_parameters ──────────────────────────────────────────────────

    /// Descriptors of `names`, in request order.
    pub fn describe_parameters<I, S>(&self, names: I) -> ParameterFuture<Vec<ParameterDescriptor>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.describe_parameters_impl(collect_names(names), None)
    }

    pub fn describe_parameters_with_callback<I, S, C>(
        &self,
        names: I,
        callback: C,
    ) -> ParameterFuture<Vec<ParameterDescriptor>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        C: FnOnce(ParameterFuture<Vec<ParameterDescriptor>>) + Send + 'static,
    {
        self.describe_parameters_impl(collect_names(names), Some(Box::new(callback)))
    }

    fn describe_parameters_impl(
        &self,
        names: Vec<String>,
        callback: Option<ParameterCallback<Vec<ParameterDescriptor>>>,
    ) -> ParameterFuture<Vec<ParameterDescriptor>> {
        if names.is_empty() {
            return resolved(Ok(Vec::new()), callback);
        }
        let expected = names.len();
        self.call(
            self.describe_parameters.as_ref(),
            "describe_parameters",
            DescribeParametersRequest { names },
            move |response| {
                check_shape("describe_parameters", expected, response.descriptors.len())?;
                Ok(response
                    .descriptors
                    .into_iter()
                    .map(ParameterDescriptor::from_wire)
                    .collect())
            },
            callback,
        )
    }

    // ── plumbing ─────────────────────────────────────────────────────────────

    /// Register a pending call, send `request` and return the future its
    /// completion will fulfill.
    fn call<Req, Resp, T, X>(
        &self,
        invoker: &dyn ServiceInvoker<Req, Resp>,
        operation: &'static str,
        request: Req,
        transform: X,
        callback: Option<ParameterCallback<T>>,
    ) -> ParameterFuture<T>
    where
        Resp: Send + 'static,
        T: Send + 'static,
        X: FnOnce(Resp) -> Result<T> + Send + 'static,
    {
        let (promise, future) = future::promise();
        let id = self.pending.register(operation, invoker.service_name());
        let slot = Arc::new(Mutex::new(Some(Finisher {
            id,
            operation,
            pending: self.pending.clone(),
            promise,
            callback,
        })));

        let on_complete: Completion<Resp> = {
            let slot = slot.clone();
            Box::new(move |raw| {
                let finisher = slot.lock().take();
                if let Some(finisher) = finisher {
                    finisher.finish(raw.and_then(transform));
                }
            })
        };

        debug!(
            "[PARAM] {operation} -> {} (request {id})",
            invoker.service_name()
        );
        if let Err(e) = invoker.send(request, on_complete) {
            warn!("[PARAM] {operation}: failed to send request {id}: {e}");
            let finisher = slot.lock().take();
            if let Some(finisher) = finisher {
                finisher.finish(Err(e));
            }
        }
        future
    }
}

/// Everything needed to complete one call, moved into its completion.
struct Finisher<T> {
    id: RequestId,
    operation: &'static str,
    pending: Arc<PendingCallRegistry>,
    promise: ParameterPromise<T>,
    callback: Option<ParameterCallback<T>>,
}

impl<T> Finisher<T> {
    fn finish(self, outcome: Result<T>) {
        match &outcome {
            Ok(_) => debug!("[PARAM] {} request {} completed", self.operation, self.id),
            Err(e) => warn!("[PARAM] {} request {} failed: {e}", self.operation, self.id),
        }
        self.pending.complete(self.id);
        let future = self.promise.future();
        self.promise.fulfill(outcome);
        if let Some(callback) = self.callback {
            callback(future);
        }
    }
}

fn resolved<T>(outcome: Result<T>, callback: Option<ParameterCallback<T>>) -> ParameterFuture<T> {
    let future = ParameterFuture::ready(outcome);
    if let Some(callback) = callback {
        callback(future.clone());
    }
    future
}

fn collect_names<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names.into_iter().map(Into::into).collect()
}

fn check_shape(operation: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(ParamError::ShapeMismatch {
            operation,
            expected,
            actual,
        })
    }
}
