use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use zenoh::Session;

use crate::{
    Builder, Result,
    context::GlobalCounter,
    entity::*,
    msg::{ServiceTypeInfo, ZService},
    reactor::ReactorHandle,
    service::{ServiceFactory, ServiceInvoker, ZClientBuilder},
};

pub struct ZNode {
    pub entity: NodeEntity,
    session: Arc<Session>,
    counter: Arc<GlobalCounter>,
}

pub struct ZNodeBuilder {
    pub domain_id: usize,
    pub name: String,
    pub namespace: String,
    pub session: Arc<Session>,
    pub counter: Arc<GlobalCounter>,
}

impl ZNodeBuilder {
    pub fn with_namespace<S: AsRef<str>>(mut self, namespace: S) -> Self {
        self.namespace = namespace.as_ref().to_owned();
        self
    }
}

impl Builder for ZNodeBuilder {
    type Output = ZNode;
    fn build(self) -> Result<ZNode> {
        let id = self.counter.increment();
        let node = NodeEntity::new(
            self.domain_id,
            self.session.zid(),
            id,
            self.name,
            self.namespace,
        );
        tracing::debug!("[NODE] created {}", node.fqn());
        Ok(ZNode {
            entity: node,
            session: self.session,
            counter: self.counter,
        })
    }
}

impl ZNode {
    /// Create a client for the given service.
    pub fn create_client<S>(&self, service: &str) -> ZClientBuilder<S>
    where
        S: ZService + ServiceTypeInfo,
    {
        let entity = EndpointEntity {
            id: self.counter.increment(),
            node: self.entity.clone(),
            topic: service.to_string(),
            kind: EntityKind::Client,
            type_name: Some(S::service_type_name().to_string()),
        };
        ZClientBuilder {
            entity,
            session: self.session.clone(),
            reactor: None,
            _phantom_data: Default::default(),
        }
    }
}

impl ServiceFactory for ZNode {
    fn node_name(&self) -> &str {
        &self.entity.name
    }

    fn create_invoker<S>(
        &self,
        service_name: &str,
        reactor: ReactorHandle,
    ) -> Result<Box<dyn ServiceInvoker<S::Request, S::Response>>>
    where
        S: ZService + ServiceTypeInfo + 'static,
        S::Request: Serialize,
        S::Response: DeserializeOwned,
    {
        let client = self
            .create_client::<S>(service_name)
            .with_reactor(reactor)
            .build()?;
        Ok(Box::new(client))
    }
}
