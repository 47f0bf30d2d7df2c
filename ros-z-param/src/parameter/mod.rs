//! ROS 2 remote parameter access.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  SyncParameterClient                                         │
//! │  ├── reactor: Arc<dyn Reactor>   (private or shared)         │
//! │  └── AsyncParameterClient                                    │
//! │      ├── pending: PendingCallRegistry                        │
//! │      └── invokers:                                           │
//! │          ├── <node>__get_parameters                          │
//! │          ├── <node>__get_parameter_types                     │
//! │          ├── <node>__set_parameters                          │
//! │          ├── <node>__set_parameters_atomically               │
//! │          ├── <node>__list_parameters                         │
//! │          └── <node>__describe_parameters                     │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod client;
pub mod sync_client;
pub mod types;
pub mod wire;

pub use client::{AsyncParameterClient, AsyncParameterClientBuilder, ParameterCallback};
pub use sync_client::{SyncParameterClient, SyncParameterClientBuilder};
pub use types::{
    FloatingPointRange, IntegerRange, ListParametersResult, ParameterDescriptor, ParameterType,
    ParameterValue, ParameterVariant, SetParametersResult,
};
pub use wire::DEPTH_RECURSIVE;
