// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `KeyManagement` plugin type. Any number may be loaded, looked up by
//! plugin name.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tether_core::{
    Constraints, Facade, FacadeBinding, PluginInfo, PluginRepo, ServiceRepo, TetherError, Version,
};
use tether_proto::keymanagement::v1::key_management_service_client::KeyManagementServiceClient;
use tether_proto::keymanagement::v1::key_management_service_server::{
    KeyManagementService, KeyManagementServiceServer,
};
use tether_proto::keymanagement::v1::{
    CreateKeyRequest, CreateKeyResponse, GetKeyRequest, GetKeyResponse, KEY_MANAGEMENT_SERVICE,
};
use tether_rpc::{GrpcPlugin, GrpcService};
use tonic::transport::Channel;
use tonic::{Request, Response, Status};

pub const KEY_MANAGEMENT_PLUGIN_TYPE: &str = "KeyManagement";

/// Parameters of a key to create.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySpec {
    /// Empty lets the plugin choose an identifier.
    pub id: String,
    pub algorithm: String,
    pub region: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyDetails {
    pub key_id: String,
    pub algorithm: String,
    pub status: String,
    pub usage: String,
}

#[async_trait]
pub trait KeyManager: Send + Sync {
    /// Create a key and return its identifier and status.
    async fn create_key(&self, spec: KeySpec) -> Result<(String, String), TetherError>;

    async fn get_key(&self, key_id: &str) -> Result<KeyDetails, TetherError>;
}

pub struct KeyManagerV1 {
    facade: Facade,
    client: KeyManagementServiceClient<Channel>,
}

impl KeyManagerV1 {
    fn rpc_error(&self, rpc: &'static str, status: Status) -> TetherError {
        TetherError::Rpc {
            rpc,
            status: self.facade.wrap_status(status),
        }
    }
}

#[async_trait]
impl KeyManager for KeyManagerV1 {
    async fn create_key(&self, spec: KeySpec) -> Result<(String, String), TetherError> {
        let mut client = self.client.clone();
        let res = client
            .create_key(CreateKeyRequest {
                id: spec.id,
                algorithm: spec.algorithm,
                region: spec.region,
            })
            .await
            .map_err(|s| self.rpc_error("CreateKey", s))?
            .into_inner();
        Ok((res.key_id, res.status))
    }

    async fn get_key(&self, key_id: &str) -> Result<KeyDetails, TetherError> {
        let mut client = self.client.clone();
        let res = client
            .get_key(GetKeyRequest {
                key_id: key_id.to_string(),
            })
            .await
            .map_err(|s| self.rpc_error("GetKey", s))?
            .into_inner();
        Ok(KeyDetails {
            key_id: res.key_id,
            algorithm: res.algorithm,
            status: res.status,
            usage: res.usage,
        })
    }
}

struct KeyManagementV1;

impl Version<dyn KeyManager> for KeyManagementV1 {
    fn grpc_service_name(&self) -> &'static str {
        KEY_MANAGEMENT_SERVICE
    }

    fn new_facade(&self, binding: FacadeBinding) -> Arc<dyn KeyManager> {
        Arc::new(KeyManagerV1 {
            facade: Facade::new(&binding),
            client: KeyManagementServiceClient::new(binding.channel),
        })
    }
}

#[derive(Default)]
pub struct KeyManagementRepository {
    managers: BTreeMap<String, Arc<dyn KeyManager>>,
}

impl KeyManagementRepository {
    pub fn get(&self, name: &str) -> Option<Arc<dyn KeyManager>> {
        self.managers.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.managers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.managers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }
}

impl ServiceRepo for KeyManagementRepository {
    type Capability = dyn KeyManager;

    fn versions(&self) -> Vec<Box<dyn Version<dyn KeyManager>>> {
        vec![Box::new(KeyManagementV1)]
    }

    fn bind(&mut self, info: &PluginInfo, facade: Arc<dyn KeyManager>) {
        self.managers.insert(info.name().to_string(), facade);
    }

    fn clear(&mut self) {
        self.managers.clear();
    }
}

impl PluginRepo for KeyManagementRepository {
    fn plugin_types(&self) -> &'static [&'static str] {
        &[KEY_MANAGEMENT_PLUGIN_TYPE]
    }

    fn constraints(&self) -> Constraints {
        Constraints::ZeroOrMore
    }
}

struct KeyManagementHandler<K> {
    manager: Arc<K>,
}

fn to_status(e: TetherError) -> Status {
    match e.status() {
        Some(status) => status.clone(),
        None => Status::internal(e.to_string()),
    }
}

#[tonic::async_trait]
impl<K: KeyManager + 'static> KeyManagementService for KeyManagementHandler<K> {
    async fn create_key(
        &self,
        request: Request<CreateKeyRequest>,
    ) -> Result<Response<CreateKeyResponse>, Status> {
        let req = request.into_inner();
        let (key_id, status) = self
            .manager
            .create_key(KeySpec {
                id: req.id,
                algorithm: req.algorithm,
                region: req.region,
            })
            .await
            .map_err(to_status)?;
        Ok(Response::new(CreateKeyResponse { key_id, status }))
    }

    async fn get_key(
        &self,
        request: Request<GetKeyRequest>,
    ) -> Result<Response<GetKeyResponse>, Status> {
        let details = self
            .manager
            .get_key(&request.into_inner().key_id)
            .await
            .map_err(to_status)?;
        Ok(Response::new(GetKeyResponse {
            key_id: details.key_id,
            algorithm: details.algorithm,
            status: details.status,
            usage: details.usage,
        }))
    }
}

/// Serve `manager` as a `KeyManagement` plugin.
pub fn key_management_plugin<K: KeyManager + 'static>(manager: Arc<K>) -> GrpcPlugin {
    GrpcService::new(KeyManagementServiceServer::new(KeyManagementHandler { manager }))
        .into_plugin(KEY_MANAGEMENT_PLUGIN_TYPE)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tether_catalog::{
        BuiltIn, BuiltInRegistry, Catalog, CatalogConfig, PluginConfig, Repos, Repository,
    };
    use tonic::Code;

    use super::*;

    /// In-memory keys; `get_key` of an unknown id is `NotFound`.
    #[derive(Default)]
    struct MemoryKeys {
        region: &'static str,
        keys: Mutex<BTreeMap<String, KeySpec>>,
    }

    #[async_trait]
    impl KeyManager for MemoryKeys {
        async fn create_key(&self, mut spec: KeySpec) -> Result<(String, String), TetherError> {
            let mut keys = self.keys.lock().unwrap();
            if spec.id.is_empty() {
                spec.id = format!("{}-key-{}", self.region, keys.len() + 1);
            }
            let id = spec.id.clone();
            keys.insert(id.clone(), spec);
            Ok((id, "ENABLED".into()))
        }

        async fn get_key(&self, key_id: &str) -> Result<KeyDetails, TetherError> {
            let keys = self.keys.lock().unwrap();
            let spec = keys.get(key_id).ok_or_else(|| TetherError::Rpc {
                rpc: "GetKey",
                status: Status::not_found(format!("no key {key_id}")),
            })?;
            Ok(KeyDetails {
                key_id: spec.id.clone(),
                algorithm: spec.algorithm.clone(),
                status: "ENABLED".into(),
                usage: "ENCRYPT_DECRYPT".into(),
            })
        }
    }

    struct Host {
        keys: KeyManagementRepository,
    }

    impl Repository for Host {
        fn repos(&mut self) -> Repos<'_> {
            Repos {
                plugins: vec![&mut self.keys],
                services: vec![],
            }
        }
    }

    #[tokio::test]
    async fn managers_are_keyed_by_plugin_name() {
        let mut builtins = BuiltInRegistry::new();
        for (name, region) in [("kms-east", "east"), ("kms-west", "west")] {
            let manager = Arc::new(MemoryKeys {
                region,
                ..Default::default()
            });
            builtins.register(BuiltIn::new(name, key_management_plugin(manager)));
        }
        let config = CatalogConfig {
            plugins: vec![
                PluginConfig::builtin("kms-east"),
                PluginConfig::builtin("kms-west"),
            ],
            ..Default::default()
        };
        let mut host = Host {
            keys: KeyManagementRepository::default(),
        };

        let catalog = Catalog::load(config, &builtins, &mut host).await.unwrap();
        assert_eq!(host.keys.names().collect::<Vec<_>>(), ["kms-east", "kms-west"]);

        let west = host.keys.get("kms-west").unwrap();
        let (id, status) = west
            .create_key(KeySpec {
                algorithm: "AES_256".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!((id.as_str(), status.as_str()), ("west-key-1", "ENABLED"));
        assert_eq!(west.get_key(&id).await.unwrap().algorithm, "AES_256");

        let err = host
            .keys
            .get("kms-east")
            .unwrap()
            .get_key(&id)
            .await
            .unwrap_err();
        let status = err.status().unwrap();
        assert_eq!(status.code(), Code::NotFound);
        assert_eq!(status.message(), "keymanagement(kms-east): no key west-key-1");

        catalog.close().await.unwrap();
    }
}
