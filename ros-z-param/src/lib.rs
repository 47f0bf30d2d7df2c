//! # ros-z-param: ROS 2 remote parameter clients
//!
//! Read and write the parameters of a remote ROS 2 node through its
//! `rcl_interfaces` parameter services.
//!
//! ## Getting started
//!
//! ```rust,ignore
//! use ros_z_param::prelude::*;
//!
//! let ctx = ZContextBuilder::default().build()?;
//! let node = ctx.create_node("param_tool").build()?;
//! let client = SyncParameterClientBuilder::new(&node)
//!     .with_remote_node("talker")
//!     .build()?;
//! let values = client.get_parameters(["use_sim_time"])?;
//! ```
//!
//! ## Sync and async APIs
//!
//! | Type | Behaviour |
//! |------|-----------|
//! | [`AsyncParameterClient`](parameter::AsyncParameterClient) | Returns a [`ParameterFuture`](future::ParameterFuture) immediately |
//! | [`SyncParameterClient`](parameter::SyncParameterClient) | Drives a [`Reactor`](reactor::Reactor) until the call completes |
//!
//! Responses are never delivered on transport threads. They are posted to a
//! reactor and run on whichever thread drives it, so an async client only
//! makes progress while someone drives its reactor.

pub mod attachment;
pub mod context;
pub mod entity;
pub mod error;
pub mod future;
pub mod msg;
pub mod node;
pub mod parameter;
pub mod pending;
pub mod prelude;
pub mod reactor;
pub mod service;

pub use error::{ParamError, Result};

/// Builds a configured object, consuming the builder.
///
/// Bring it into scope to call `.build()`, or use `ros_z_param::prelude::*`.
pub trait Builder {
    /// The type produced by this builder.
    type Output;
    /// Consume the builder and construct the configured object.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or if a transport
    /// resource could not be created.
    fn build(self) -> Result<Self::Output>;
}
