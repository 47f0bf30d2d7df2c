//! Common imports: `use ros_z_param::prelude::*;`

pub use crate::Builder;
pub use crate::context::{ZContext, ZContextBuilder};
pub use crate::error::{ParamError, Result};
pub use crate::future::ParameterFuture;
pub use crate::node::ZNode;
pub use crate::parameter::{
    AsyncParameterClient, AsyncParameterClientBuilder, DEPTH_RECURSIVE, ListParametersResult,
    ParameterDescriptor, ParameterType, ParameterValue, ParameterVariant, SetParametersResult,
    SyncParameterClient, SyncParameterClientBuilder,
};
pub use crate::reactor::{DriveOutcome, Reactor, ReactorHandle, SingleThreadedReactor};
pub use crate::service::{LoopbackNode, ServiceFactory, ServiceInvoker};
