//! `rcl_interfaces` messages and services in their CDR wire layout.
//!
//! Field order matters: CDR is positional, so each struct mirrors the
//! corresponding `.msg`/`.srv` definition exactly.

use serde::{Deserialize, Serialize};

use crate::msg::{ServiceTypeInfo, ZService};

/// `rcl_interfaces/msg/ParameterType` constants.
pub mod parameter_type {
    pub const NOT_SET: u8 = 0;
    pub const BOOL: u8 = 1;
    pub const INTEGER: u8 = 2;
    pub const DOUBLE: u8 = 3;
    pub const STRING: u8 = 4;
    pub const BYTE_ARRAY: u8 = 5;
    pub const BOOL_ARRAY: u8 = 6;
    pub const INTEGER_ARRAY: u8 = 7;
    pub const DOUBLE_ARRAY: u8 = 8;
    pub const STRING_ARRAY: u8 = 9;
}

/// `ListParameters` depth meaning "no limit".
pub const DEPTH_RECURSIVE: u64 = 0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireParameterValue {
    pub r#type: u8,
    pub bool_value: bool,
    pub integer_value: i64,
    pub double_value: f64,
    pub string_value: String,
    pub byte_array_value: Vec<u8>,
    pub bool_array_value: Vec<bool>,
    pub integer_array_value: Vec<i64>,
    pub double_array_value: Vec<f64>,
    pub string_array_value: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireParameter {
    pub name: String,
    pub value: WireParameterValue,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireFloatingPointRange {
    pub from_value: f64,
    pub to_value: f64,
    pub step: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireIntegerRange {
    pub from_value: i64,
    pub to_value: i64,
    pub step: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireParameterDescriptor {
    pub name: String,
    pub r#type: u8,
    pub description: String,
    pub additional_constraints: String,
    pub read_only: bool,
    pub dynamic_typing: bool,
    pub floating_point_range: Vec<WireFloatingPointRange>,
    pub integer_range: Vec<WireIntegerRange>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireSetParametersResult {
    pub successful: bool,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireListParametersResult {
    pub names: Vec<String>,
    pub prefixes: Vec<String>,
}

// ── Services ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetParametersRequest {
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetParametersResponse {
    pub values: Vec<WireParameterValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetParameterTypesRequest {
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetParameterTypesResponse {
    pub types: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetParametersRequest {
    pub parameters: Vec<WireParameter>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetParametersResponse {
    pub results: Vec<WireSetParametersResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetParametersAtomicallyRequest {
    pub parameters: Vec<WireParameter>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetParametersAtomicallyResponse {
    pub result: WireSetParametersResult,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListParametersRequest {
    pub prefixes: Vec<String>,
    pub depth: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListParametersResponse {
    pub result: WireListParametersResult,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DescribeParametersRequest {
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DescribeParametersResponse {
    pub descriptors: Vec<WireParameterDescriptor>,
}

macro_rules! parameter_service {
    ($srv:ident, $req:ty, $resp:ty, $suffix:literal, $type_name:literal) => {
        pub struct $srv;

        impl $srv {
            /// Suffix appended to the target node name to form the service name.
            pub const SUFFIX: &'static str = $suffix;
        }

        impl ZService for $srv {
            type Request = $req;
            type Response = $resp;
        }

        impl ServiceTypeInfo for $srv {
            fn service_type_name() -> &'static str {
                $type_name
            }
        }
    };
}

parameter_service!(
    GetParametersSrv,
    GetParametersRequest,
    GetParametersResponse,
    "__get_parameters",
    "rcl_interfaces::srv::dds_::GetParameters_"
);
parameter_service!(
    GetParameterTypesSrv,
    GetParameterTypesRequest,
    GetParameterTypesResponse,
    "__get_parameter_types",
    "rcl_interfaces::srv::dds_::GetParameterTypes_"
);
parameter_service!(
    SetParametersSrv,
    SetParametersRequest,
    SetParametersResponse,
    "__set_parameters",
    "rcl_interfaces::srv::dds_::SetParameters_"
);
parameter_service!(
    SetParametersAtomicallySrv,
    SetParametersAtomicallyRequest,
    SetParametersAtomicallyResponse,
    "__set_parameters_atomically",
    "rcl_interfaces::srv::dds_::SetParametersAtomically_"
);
parameter_service!(
    ListParametersSrv,
    ListParametersRequest,
    ListParametersResponse,
    "__list_parameters",
    "rcl_interfaces::srv::dds_::ListParameters_"
);
parameter_service!(
    DescribeParametersSrv,
    DescribeParametersRequest,
    DescribeParametersResponse,
    "__describe_parameters",
    "rcl_interfaces::srv::dds_::DescribeParameters_"
);
