#![allow(dead_code)]

use std::{
    collections::{BTreeMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use parking_lot::Mutex;
use ros_z_param::{
    Result,
    parameter::{
        ParameterDescriptor, ParameterType, ParameterValue, ParameterVariant, SetParametersResult,
        wire::*,
    },
    reactor::{DriveOutcome, Reactor, ReactorHandle, SingleThreadedReactor},
    service::LoopbackNode,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Misbehaviour a [`ParameterServer`] can be told to exhibit.
#[derive(Debug, Default)]
pub struct Faults {
    /// Never answer.
    pub silent: AtomicBool,
    /// Answer list-shaped requests with one entry too few.
    pub drop_last_entry: AtomicBool,
    /// Apply only the first entry of an atomic set, then report failure.
    pub partial_atomic: AtomicBool,
}

#[derive(Default)]
struct Store {
    values: BTreeMap<String, ParameterValue>,
    read_only: HashSet<String>,
    descriptions: BTreeMap<String, String>,
}

impl Store {
    fn set(&mut self, parameter: &ParameterVariant) -> SetParametersResult {
        if self.read_only.contains(&parameter.name) {
            return SetParametersResult::failure(format!(
                "parameter '{}' is read-only",
                parameter.name
            ));
        }
        if parameter.name.is_empty() {
            return SetParametersResult::failure("empty parameter name");
        }
        match &parameter.value {
            ParameterValue::NotSet => {
                self.values.remove(&parameter.name);
            }
            value => {
                self.values.insert(parameter.name.clone(), value.clone());
            }
        }
        SetParametersResult::success()
    }

    fn validate(&self, parameter: &ParameterVariant) -> Option<String> {
        if self.read_only.contains(&parameter.name) {
            Some(format!("parameter '{}' is read-only", parameter.name))
        } else if parameter.name.is_empty() {
            Some("empty parameter name".to_string())
        } else {
            None
        }
    }

    fn list(&self, prefixes: &[String], depth: u64) -> WireListParametersResult {
        let separator = '.';
        let within_depth = |rest: &str| {
            depth == DEPTH_RECURSIVE || (rest.matches(separator).count() as u64) < depth
        };

        let mut result = WireListParametersResult::default();
        for name in self.values.keys() {
            let get_all = prefixes.is_empty() && within_depth(name.as_str());
            let matches_prefix = prefixes.iter().any(|prefix| {
                if name == prefix {
                    return true;
                }
                match name.strip_prefix(prefix.as_str()) {
                    Some(rest) => rest
                        .strip_prefix(separator)
                        .is_some_and(|rest| within_depth(rest)),
                    None => false,
                }
            });
            if get_all || matches_prefix {
                result.names.push(name.clone());
                if let Some((parent, _)) = name.rsplit_once(separator) {
                    if !result.prefixes.iter().any(|p| p == parent) {
                        result.prefixes.push(parent.to_string());
                    }
                }
            }
        }
        result.prefixes.sort();
        result
    }
}

/// An in-memory node exposing the six parameter services on a [`LoopbackNode`].
#[derive(Clone)]
pub struct ParameterServer {
    name: String,
    store: Arc<Mutex<Store>>,
    pub faults: Arc<Faults>,
    pub requests: Arc<AtomicUsize>,
}

impl ParameterServer {
    pub fn install(bus: &LoopbackNode, name: &str) -> Self {
        let server = Self {
            name: name.to_string(),
            store: Default::default(),
            faults: Default::default(),
            requests: Default::default(),
        };

        let s = server.clone();
        bus.serve::<GetParametersSrv, _>(&server.service(GetParametersSrv::SUFFIX), move |req| {
            s.answer(|store| GetParametersResponse {
                values: s.trim(
                    req.names
                        .iter()
                        .map(|n| store.values.get(n).cloned().unwrap_or_default().to_wire())
                        .collect(),
                ),
            })
        });

        let s = server.clone();
        bus.serve::<GetParameterTypesSrv, _>(
            &server.service(GetParameterTypesSrv::SUFFIX),
            move |req| {
                s.answer(|store| GetParameterTypesResponse {
                    types: s.trim(
                        req.names
                            .iter()
                            .map(|n| {
                                store
                                    .values
                                    .get(n)
                                    .map(ParameterValue::parameter_type)
                                    .unwrap_or_default()
                                    .to_u8()
                            })
                            .collect(),
                    ),
                })
            },
        );

        let s = server.clone();
        bus.serve::<SetParametersSrv, _>(&server.service(SetParametersSrv::SUFFIX), move |req| {
            s.answer(|store| SetParametersResponse {
                results: s.trim(
                    req.parameters
                        .into_iter()
                        .map(|p| store.set(&ParameterVariant::from_wire(p)).to_wire())
                        .collect(),
                ),
            })
        });

        let s = server.clone();
        bus.serve::<SetParametersAtomicallySrv, _>(
            &server.service(SetParametersAtomicallySrv::SUFFIX),
            move |req| {
                s.answer(|store| {
                    let parameters: Vec<_> = req
                        .parameters
                        .into_iter()
                        .map(ParameterVariant::from_wire)
                        .collect();
                    if s.faults.partial_atomic.load(Ordering::SeqCst) {
                        if let Some(first) = parameters.first() {
                            store.set(first);
                        }
                        return SetParametersAtomicallyResponse {
                            result: SetParametersResult::failure("applied 1 entry, then gave up")
                                .to_wire(),
                        };
                    }
                    let rejection = parameters.iter().find_map(|p| store.validate(p));
                    let result = match rejection {
                        Some(reason) => SetParametersResult::failure(reason),
                        None => {
                            for p in &parameters {
                                store.set(p);
                            }
                            SetParametersResult::success()
                        }
                    };
                    SetParametersAtomicallyResponse {
                        result: result.to_wire(),
                    }
                })
            },
        );

        let s = server.clone();
        bus.serve::<ListParametersSrv, _>(&server.service(ListParametersSrv::SUFFIX), move |req| {
            s.answer(|store| ListParametersResponse {
                result: store.list(&req.prefixes, req.depth),
            })
        });

        let s = server.clone();
        bus.serve::<DescribeParametersSrv, _>(
            &server.service(DescribeParametersSrv::SUFFIX),
            move |req| {
                s.answer(|store| DescribeParametersResponse {
                    descriptors: s.trim(
                        req.names
                            .iter()
                            .map(|n| {
                                let type_ = store
                                    .values
                                    .get(n)
                                    .map(ParameterValue::parameter_type)
                                    .unwrap_or(ParameterType::NotSet);
                                let mut descriptor = ParameterDescriptor::new(n.as_str(), type_);
                                descriptor.read_only = store.read_only.contains(n);
                                if let Some(d) = store.descriptions.get(n) {
                                    descriptor.description = d.clone();
                                }
                                descriptor.to_wire()
                            })
                            .collect(),
                    ),
                })
            },
        );

        server
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declare(&self, name: &str, value: impl Into<ParameterValue>) -> &Self {
        self.store.lock().values.insert(name.to_string(), value.into());
        self
    }

    pub fn declare_read_only(&self, name: &str, value: impl Into<ParameterValue>) -> &Self {
        let mut store = self.store.lock();
        store.values.insert(name.to_string(), value.into());
        store.read_only.insert(name.to_string());
        self
    }

    pub fn describe(&self, name: &str, description: &str) -> &Self {
        self.store
            .lock()
            .descriptions
            .insert(name.to_string(), description.to_string());
        self
    }

    pub fn value(&self, name: &str) -> Option<ParameterValue> {
        self.store.lock().values.get(name).cloned()
    }

    pub fn go_silent(&self) {
        self.faults.silent.store(true, Ordering::SeqCst);
    }

    pub fn drop_last_entry(&self) {
        self.faults.drop_last_entry.store(true, Ordering::SeqCst);
    }

    pub fn apply_partially(&self) {
        self.faults.partial_atomic.store(true, Ordering::SeqCst);
    }

    fn service(&self, suffix: &str) -> String {
        format!("{}{suffix}", self.name)
    }

    fn answer<R>(&self, f: impl FnOnce(&mut Store) -> R) -> Option<R> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.faults.silent.load(Ordering::SeqCst) {
            return None;
        }
        Some(f(&mut self.store.lock()))
    }

    fn trim<T>(&self, mut entries: Vec<T>) -> Vec<T> {
        if self.faults.drop_last_entry.load(Ordering::SeqCst) {
            entries.pop();
        }
        entries
    }
}

/// A reactor that counts how often it is driven.
#[derive(Default)]
pub struct CountingReactor {
    inner: SingleThreadedReactor,
    drives: AtomicUsize,
}

impl CountingReactor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drives(&self) -> usize {
        self.drives.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &SingleThreadedReactor {
        &self.inner
    }
}

impl Reactor for CountingReactor {
    fn handle(&self) -> ReactorHandle {
        self.inner.handle()
    }

    fn drive_until(
        &self,
        ready: &dyn Fn() -> bool,
        timeout: Option<Duration>,
    ) -> Result<DriveOutcome> {
        self.drives.fetch_add(1, Ordering::SeqCst);
        self.inner.drive_until(ready, timeout)
    }
}
