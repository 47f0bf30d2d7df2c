use std::fmt::Display;
use std::ops::Deref;

use sha2::Digest;
use zenoh::{key_expr::KeyExpr, session::ZenohId};

use crate::{ParamError, Result, attachment::GidArray};

const EMPTY_NAMESPACE: &str = "%";
// rmw_zenoh builds without type hashes publish this placeholder
const TYPE_HASH_NOT_SUPPORTED: &str = "TypeHashNotSupported";

pub struct TopicKE(KeyExpr<'static>);

impl Deref for TopicKE {
    type Target = KeyExpr<'static>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Default, Debug, Hash, Clone, PartialEq, Eq)]
pub struct NodeEntity {
    pub domain_id: usize,
    pub z_id: ZenohId,
    pub id: usize,
    pub name: String,
    pub namespace: String,
}

impl NodeEntity {
    pub fn new(
        domain_id: usize,
        z_id: ZenohId,
        id: usize,
        name: String,
        namespace: String,
    ) -> Self {
        Self {
            domain_id,
            z_id,
            id,
            name,
            namespace,
        }
    }

    /// Fully qualified node name, e.g. `/ns/talker`.
    pub fn fqn(&self) -> String {
        let ns = self.namespace.trim_end_matches('/');
        if ns.is_empty() {
            format!("/{}", self.name)
        } else if ns.starts_with('/') {
            format!("{ns}/{}", self.name)
        } else {
            format!("/{ns}/{}", self.name)
        }
    }
}

#[derive(Default, Debug, Hash, strum::EnumString, strum::Display, Eq, PartialEq, Clone, Copy)]
pub enum EntityKind {
    #[default]
    #[strum(serialize = "NN")]
    Node,
    #[strum(serialize = "SS")]
    Service,
    #[strum(serialize = "SC")]
    Client,
}

#[derive(Default, Debug, Hash, PartialEq, Eq, Clone)]
pub struct EndpointEntity {
    pub id: usize,
    pub node: NodeEntity,
    pub kind: EntityKind,
    pub topic: String,
    pub type_name: Option<String>,
}

fn mangle_name(name: &str) -> String {
    name.replace('/', "%")
}

impl TryFrom<&EndpointEntity> for TopicKE {
    type Error = ParamError;

    // <domain_id>/<topic_name>/<topic_type>/<topic_type_hash>
    fn try_from(value: &EndpointEntity) -> Result<Self> {
        let NodeEntity { domain_id, .. } = value.node;
        let topic = {
            let s = &value.topic;
            let s = s.strip_prefix('/').unwrap_or(s);
            let s = s.strip_suffix('/').unwrap_or(s);
            mangle_name(s)
        };
        let type_name = value
            .type_name
            .as_deref()
            .ok_or_else(|| ParamError::Construction(format!("no type for '{}'", value.topic)))?;
        let ke = format!("{domain_id}/{topic}/{type_name}/{TYPE_HASH_NOT_SUPPORTED}");
        KeyExpr::try_from(ke)
            .map(TopicKE)
            .map_err(|e| ParamError::Construction(e.to_string()))
    }
}

impl Display for EndpointEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let namespace = if self.node.namespace.is_empty() {
            EMPTY_NAMESPACE.to_string()
        } else {
            mangle_name(&self.node.namespace)
        };
        write!(
            f,
            "{}/{}/{}/{}/{}/{}/{}/{}",
            self.node.domain_id,
            self.node.z_id,
            self.node.id,
            self.id,
            self.kind,
            namespace,
            mangle_name(&self.node.name),
            mangle_name(&self.topic),
        )
    }
}

impl EndpointEntity {
    pub fn topic_key_expr(&self) -> Result<KeyExpr<'static>> {
        let ke: TopicKE = self.try_into()?;
        Ok(ke.0)
    }

    pub fn gid(&self) -> GidArray {
        let mut gid = GidArray::default();
        let hash = sha2::Sha256::digest(self.to_string().as_bytes());
        let len = gid.len();
        gid.copy_from_slice(&hash[..len]);
        gid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(topic: &str) -> EndpointEntity {
        EndpointEntity {
            id: 3,
            node: NodeEntity {
                domain_id: 0,
                name: "param_tool".into(),
                ..Default::default()
            },
            kind: EntityKind::Client,
            topic: topic.into(),
            type_name: Some("rcl_interfaces::srv::dds_::GetParameters_".into()),
        }
    }

    #[test]
    fn test_service_key_expr() {
        let ke = endpoint("/talker__get_parameters").topic_key_expr().unwrap();
        assert_eq!(
            ke.as_str(),
            "0/talker__get_parameters/rcl_interfaces::srv::dds_::GetParameters_/TypeHashNotSupported"
        );
    }

    #[test]
    fn test_namespaced_service_is_mangled() {
        let ke = endpoint("/robot/talker__get_parameters").topic_key_expr().unwrap();
        assert!(ke.as_str().starts_with("0/robot%talker__get_parameters/"));
    }

    #[test]
    fn test_gid_differs_per_endpoint() {
        assert_ne!(endpoint("/a").gid(), endpoint("/b").gid());
        assert_eq!(endpoint("/a").gid(), endpoint("/a").gid());
    }

    #[test]
    fn test_node_fqn() {
        let mut node = NodeEntity {
            name: "talker".into(),
            ..Default::default()
        };
        assert_eq!(node.fqn(), "/talker");
        node.namespace = "/robot".into();
        assert_eq!(node.fqn(), "/robot/talker");
    }
}
