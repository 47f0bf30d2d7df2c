//! User-facing parameter types.
//!
//! These types provide an ergonomic Rust API for reading and updating remote
//! parameters. They convert to/from the wire format types for CDR
//! serialization.

use strum::{Display, EnumIter, FromRepr};

use super::wire::{
    self, WireFloatingPointRange, WireIntegerRange, WireListParametersResult, WireParameter,
    WireParameterDescriptor, WireParameterValue, WireSetParametersResult,
};

/// The type of a parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumIter, FromRepr)]
#[repr(u8)]
#[strum(serialize_all = "snake_case")]
pub enum ParameterType {
    #[default]
    NotSet = wire::parameter_type::NOT_SET,
    Bool = wire::parameter_type::BOOL,
    Integer = wire::parameter_type::INTEGER,
    Double = wire::parameter_type::DOUBLE,
    String = wire::parameter_type::STRING,
    ByteArray = wire::parameter_type::BYTE_ARRAY,
    BoolArray = wire::parameter_type::BOOL_ARRAY,
    IntegerArray = wire::parameter_type::INTEGER_ARRAY,
    DoubleArray = wire::parameter_type::DOUBLE_ARRAY,
    StringArray = wire::parameter_type::STRING_ARRAY,
}

impl ParameterType {
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Decode a raw type code. Codes outside the known range decode to `NotSet`.
    pub fn from_u8(v: u8) -> Self {
        Self::from_repr(v).unwrap_or(Self::NotSet)
    }
}

/// A typed parameter value.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ParameterValue {
    #[default]
    NotSet,
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(std::string::String),
    ByteArray(Vec<u8>),
    BoolArray(Vec<bool>),
    IntegerArray(Vec<i64>),
    DoubleArray(Vec<f64>),
    StringArray(Vec<std::string::String>),
}

impl ParameterValue {
    /// Returns the parameter type of this value.
    pub fn parameter_type(&self) -> ParameterType {
        match self {
            Self::NotSet => ParameterType::NotSet,
            Self::Bool(_) => ParameterType::Bool,
            Self::Integer(_) => ParameterType::Integer,
            Self::Double(_) => ParameterType::Double,
            Self::String(_) => ParameterType::String,
            Self::ByteArray(_) => ParameterType::ByteArray,
            Self::BoolArray(_) => ParameterType::BoolArray,
            Self::IntegerArray(_) => ParameterType::IntegerArray,
            Self::DoubleArray(_) => ParameterType::DoubleArray,
            Self::StringArray(_) => ParameterType::StringArray,
        }
    }

    /// Convert to wire format. Only the slot matching the type code is populated.
    pub fn to_wire(&self) -> WireParameterValue {
        let mut wire = WireParameterValue {
            r#type: self.parameter_type().to_u8(),
            ..Default::default()
        };
        match self {
            Self::NotSet => {}
            Self::Bool(v) => wire.bool_value = *v,
            Self::Integer(v) => wire.integer_value = *v,
            Self::Double(v) => wire.double_value = *v,
            Self::String(v) => wire.string_value = v.clone(),
            Self::ByteArray(v) => wire.byte_array_value = v.clone(),
            Self::BoolArray(v) => wire.bool_array_value = v.clone(),
            Self::IntegerArray(v) => wire.integer_array_value = v.clone(),
            Self::DoubleArray(v) => wire.double_array_value = v.clone(),
            Self::StringArray(v) => wire.string_array_value = v.clone(),
        }
        wire
    }

    /// Convert from wire format, reading only the slot named by the type code.
    pub fn from_wire(wire: WireParameterValue) -> Self {
        match ParameterType::from_u8(wire.r#type) {
            ParameterType::NotSet => Self::NotSet,
            ParameterType::Bool => Self::Bool(wire.bool_value),
            ParameterType::Integer => Self::Integer(wire.integer_value),
            ParameterType::Double => Self::Double(wire.double_value),
            ParameterType::String => Self::String(wire.string_value),
            ParameterType::ByteArray => Self::ByteArray(wire.byte_array_value),
            ParameterType::BoolArray => Self::BoolArray(wire.bool_array_value),
            ParameterType::IntegerArray => Self::IntegerArray(wire.integer_array_value),
            ParameterType::DoubleArray => Self::DoubleArray(wire.double_array_value),
            ParameterType::StringArray => Self::StringArray(wire.string_array_value),
        }
    }
}

impl std::fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotSet => write!(f, "not set"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v}"),
            Self::ByteArray(v) => write!(f, "{v:?}"),
            Self::BoolArray(v) => write!(f, "{v:?}"),
            Self::IntegerArray(v) => write!(f, "{v:?}"),
            Self::DoubleArray(v) => write!(f, "{v:?}"),
            Self::StringArray(v) => write!(f, "{v:?}"),
        }
    }
}

macro_rules! impl_from_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for ParameterValue {
                fn from(v: $ty) -> Self {
                    Self::$variant(v.into())
                }
            }
        )*
    };
}

impl_from_value!(
    bool => Bool,
    i64 => Integer,
    i32 => Integer,
    f64 => Double,
    std::string::String => String,
    &str => String,
    Vec<u8> => ByteArray,
    Vec<bool> => BoolArray,
    Vec<i64> => IntegerArray,
    Vec<f64> => DoubleArray,
    Vec<std::string::String> => StringArray,
);

/// A named parameter with its value. The type tag is derived from the value,
/// so it can never disagree with the populated slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterVariant {
    pub name: std::string::String,
    pub value: ParameterValue,
}

impl ParameterVariant {
    pub fn new(name: impl Into<std::string::String>, value: impl Into<ParameterValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// A variant that asks the remote to unset `name`.
    pub fn not_set(name: impl Into<std::string::String>) -> Self {
        Self {
            name: name.into(),
            value: ParameterValue::NotSet,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameter_type(&self) -> ParameterType {
        self.value.parameter_type()
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.value {
            ParameterValue::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self.value {
            ParameterValue::Integer(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.value {
            ParameterValue::Double(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            ParameterValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn to_wire(&self) -> WireParameter {
        WireParameter {
            name: self.name.clone(),
            value: self.value.to_wire(),
        }
    }

    pub fn from_wire(wire: WireParameter) -> Self {
        Self {
            name: wire.name,
            value: ParameterValue::from_wire(wire.value),
        }
    }
}

/// Range constraint for floating point parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatingPointRange {
    pub from_value: f64,
    pub to_value: f64,
    pub step: f64,
}

/// Range constraint for integer parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegerRange {
    pub from_value: i64,
    pub to_value: i64,
    pub step: u64,
}

/// Descriptor for a parameter, including constraints.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterDescriptor {
    pub name: std::string::String,
    pub type_: ParameterType,
    pub description: std::string::String,
    pub additional_constraints: std::string::String,
    pub read_only: bool,
    pub dynamic_typing: bool,
    pub floating_point_range: Option<FloatingPointRange>,
    pub integer_range: Option<IntegerRange>,
}

impl ParameterDescriptor {
    pub fn new(name: impl Into<std::string::String>, type_: ParameterType) -> Self {
        Self {
            name: name.into(),
            type_,
            ..Default::default()
        }
    }

    pub fn to_wire(&self) -> WireParameterDescriptor {
        WireParameterDescriptor {
            name: self.name.clone(),
            r#type: self.type_.to_u8(),
            description: self.description.clone(),
            additional_constraints: self.additional_constraints.clone(),
            read_only: self.read_only,
            dynamic_typing: self.dynamic_typing,
            floating_point_range: self
                .floating_point_range
                .iter()
                .map(|r| WireFloatingPointRange {
                    from_value: r.from_value,
                    to_value: r.to_value,
                    step: r.step,
                })
                .collect(),
            integer_range: self
                .integer_range
                .iter()
                .map(|r| WireIntegerRange {
                    from_value: r.from_value,
                    to_value: r.to_value,
                    step: r.step,
                })
                .collect(),
        }
    }

    pub fn from_wire(wire: WireParameterDescriptor) -> Self {
        Self {
            name: wire.name,
            type_: ParameterType::from_u8(wire.r#type),
            description: wire.description,
            additional_constraints: wire.additional_constraints,
            read_only: wire.read_only,
            dynamic_typing: wire.dynamic_typing,
            // At most one range is meaningful; extra entries are ignored.
            floating_point_range: wire.floating_point_range.first().map(|r| FloatingPointRange {
                from_value: r.from_value,
                to_value: r.to_value,
                step: r.step,
            }),
            integer_range: wire.integer_range.first().map(|r| IntegerRange {
                from_value: r.from_value,
                to_value: r.to_value,
                step: r.step,
            }),
        }
    }
}

/// Result of a set operation, per entry or aggregate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetParametersResult {
    pub successful: bool,
    pub reason: std::string::String,
}

impl SetParametersResult {
    pub fn success() -> Self {
        Self {
            successful: true,
            reason: std::string::String::new(),
        }
    }

    pub fn failure(reason: impl Into<std::string::String>) -> Self {
        Self {
            successful: false,
            reason: reason.into(),
        }
    }

    pub fn to_wire(&self) -> WireSetParametersResult {
        WireSetParametersResult {
            successful: self.successful,
            reason: self.reason.clone(),
        }
    }

    pub fn from_wire(wire: WireSetParametersResult) -> Self {
        Self {
            successful: wire.successful,
            reason: wire.reason,
        }
    }
}

/// Names and namespace prefixes returned by `list_parameters`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParametersResult {
    pub names: Vec<std::string::String>,
    pub prefixes: Vec<std::string::String>,
}

impl ListParametersResult {
    pub fn from_wire(wire: WireListParametersResult) -> Self {
        Self {
            names: wire.names,
            prefixes: wire.prefixes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_type_codes_match_rcl_interfaces() {
        for (code, ty) in ParameterType::iter().enumerate() {
            assert_eq!(ty.to_u8() as usize, code);
            assert_eq!(ParameterType::from_u8(code as u8), ty);
        }
        assert_eq!(ParameterType::from_u8(42), ParameterType::NotSet);
        assert_eq!(ParameterType::IntegerArray.to_string(), "integer_array");
    }

    #[test]
    fn test_from_wire_reads_only_the_tagged_slot() {
        let wire = WireParameterValue {
            r#type: wire::parameter_type::DOUBLE,
            double_value: 2.5,
            // Stale data in another slot must be ignored.
            integer_value: 99,
            ..Default::default()
        };
        assert_eq!(ParameterValue::from_wire(wire), ParameterValue::Double(2.5));
    }

    #[test]
    fn test_variant_tag_follows_value() {
        let p = ParameterVariant::new("rate", 10i64);
        assert_eq!(p.parameter_type(), ParameterType::Integer);
        assert_eq!(p.as_i64(), Some(10));
        assert_eq!(p.as_str(), None);

        let wire = p.to_wire();
        assert_eq!(wire.value.r#type, wire::parameter_type::INTEGER);
        assert_eq!(ParameterVariant::from_wire(wire), p);

        let unset = ParameterVariant::not_set("rate");
        assert_eq!(unset.parameter_type(), ParameterType::NotSet);
    }

    #[test]
    fn test_descriptor_keeps_first_range() {
        let mut desc = ParameterDescriptor::new("speed", ParameterType::Double);
        desc.floating_point_range = Some(FloatingPointRange {
            from_value: 0.0,
            to_value: 10.0,
            step: 0.5,
        });
        let wire = desc.to_wire();
        assert_eq!(wire.floating_point_range.len(), 1);
        assert!(wire.integer_range.is_empty());
        assert_eq!(ParameterDescriptor::from_wire(wire), desc);
    }
}
