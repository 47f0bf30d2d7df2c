use cdr::{CdrLe, Infinite};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::marker::PhantomData;

use crate::{ParamError, Result};

pub trait ZSerializer {
    type Input<'a>
    where
        Self: 'a;
    fn serialize(input: Self::Input<'_>) -> Result<Vec<u8>>;
}

pub trait ZDeserializer {
    type Input<'a>;
    type Output;
    fn deserialize(input: Self::Input<'_>) -> Result<Self::Output>;
}

/// A message that can cross the wire as CDR through [`CdrSerdes`].
pub trait ZMessage: Serialize + DeserializeOwned + Send + 'static {}

impl<T> ZMessage for T where T: Serialize + DeserializeOwned + Send + 'static {}

// CDR

pub struct CdrSerdes<T>(PhantomData<T>);

impl<T> ZSerializer for CdrSerdes<T>
where
    T: Serialize,
{
    type Input<'a>
        = &'a T
    where
        T: 'a;

    fn serialize(input: &T) -> Result<Vec<u8>> {
        cdr::serialize::<_, _, CdrLe>(input, Infinite)
            .map_err(|e| ParamError::Transport(format!("CDR serialization failed: {e}")))
    }
}

impl<T> ZDeserializer for CdrSerdes<T>
where
    for<'a> T: Deserialize<'a>,
{
    type Input<'b> = &'b [u8];
    type Output = T;

    fn deserialize(input: Self::Input<'_>) -> Result<T> {
        cdr::deserialize::<T>(input).map_err(|e| ParamError::Decode(e.to_string()))
    }
}

/// A request/response pair exposed as a named remote operation.
pub trait ZService {
    type Request: ZMessage;
    type Response: ZMessage;
}

/// ROS type name of a service, used to build its key expression.
pub trait ServiceTypeInfo {
    fn service_type_name() -> &'static str;
}
