//! Node assembly
//!
//! Builds the substrate components from configuration and selects the
//! federation client implementation for the configured topology at
//! startup. Business services receive the assembled `Node` and stay
//! topology-agnostic.

use std::sync::Arc;
use std::time::Duration;

use coopnet_common::Result;
use coopnet_federation::{
    FederationClient, FederationReceiver, HttpFederationClient, LocalFederationClient,
};
use coopnet_firehose::FirehoseConsumer;
use coopnet_identity::{
    DidDocument, Keystore, MultiResolver, RegistryDidResolver, Service, VerificationMethod,
    WebDidResolver, FEDERATION_KEY_FRAGMENT, FEDERATION_SERVICE_ID, FEDERATION_SERVICE_TYPE,
};
use coopnet_indexer::{
    AgreementIndexer, ChangeNotifier, IndexerDispatch, MembershipIndexer, ProfileIndexer,
};
use coopnet_outbox::{
    BackoffPolicy, DeliveryAgent, DeliveryConfig, OutboxMessage, OutboxStore, StorageOutboxStore,
};
use coopnet_storage::{file_storage, memory_storage, Storage, StorageConfig};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::{NodeConfig, Topology};

/// One assembled instance of the federation substrate
pub struct Node {
    pub config: NodeConfig,
    pub storage: Arc<dyn Storage>,
    pub resolver: Arc<MultiResolver>,
    pub registry: Arc<RegistryDidResolver>,
    pub keystore: Arc<Keystore>,
    pub notifier: Arc<ChangeNotifier>,
    pub indexers: Arc<IndexerDispatch>,
    pub outbox: Arc<dyn OutboxStore>,
    pub federation: Arc<dyn FederationClient>,
    delivery_agent: Arc<DeliveryAgent>,
}

impl Node {
    /// Assemble a node; generates the instance signing key on first start
    pub async fn build(
        config: NodeConfig,
        receiver: Arc<dyn FederationReceiver>,
    ) -> Result<Self> {
        let storage: Arc<dyn Storage> = if config.data_dir == ":memory:" {
            memory_storage()
        } else {
            file_storage(StorageConfig {
                base_dir: config.data_dir.clone().into(),
            })
            .await?
        };

        let keystore = Arc::new(Keystore::new(storage.clone(), config.instance_key_bytes()?)?);
        if !keystore.has_key(&config.instance_did).await? {
            keystore.create_keypair(&config.instance_did).await?;
            info!(did = %config.instance_did, "Generated instance signing key");
        }

        let registry = Arc::new(RegistryDidResolver::new(storage.clone()));
        let resolver = Arc::new(MultiResolver::new(vec![
            registry.clone(),
            Arc::new(WebDidResolver::new()),
        ]));

        let notifier = Arc::new(ChangeNotifier::default());
        let indexers = Arc::new(IndexerDispatch::new(vec![
            Arc::new(MembershipIndexer::new(storage.clone(), notifier.clone())),
            Arc::new(AgreementIndexer::new(storage.clone(), notifier.clone())),
            Arc::new(ProfileIndexer::new(storage.clone())),
        ]));

        let outbox = Arc::new(StorageOutboxStore::new(
            storage.clone(),
            BackoffPolicy {
                base: Duration::from_secs(config.backoff_base_secs),
                max: Duration::from_secs(config.backoff_max_secs),
            },
        ));
        let delivery_agent = DeliveryAgent::new(
            outbox.clone(),
            keystore.clone(),
            config.instance_did.clone(),
            DeliveryConfig {
                poll_interval: Duration::from_secs(config.outbox_poll_secs),
                batch_size: config.outbox_batch,
                sending_grace: Duration::from_secs(config.sending_grace_secs),
            },
        );

        let federation: Arc<dyn FederationClient> = match config.topology {
            Topology::Standalone => Arc::new(LocalFederationClient::new(receiver)),
            Topology::Federated => Arc::new(HttpFederationClient::new(
                resolver.clone(),
                keystore.clone(),
                config.instance_did.clone(),
                config.hub_did.clone(),
            )),
        };
        info!(topology = ?config.topology, did = %config.instance_did, "Node assembled");

        Ok(Self {
            config,
            storage,
            resolver,
            registry,
            keystore,
            notifier,
            indexers,
            outbox,
            federation,
            delivery_agent,
        })
    }

    /// Start the outbox delivery poller
    pub fn spawn_delivery_agent(&self) -> JoinHandle<()> {
        self.delivery_agent.clone().spawn()
    }

    /// Start consuming firehose frames from a channel
    pub fn spawn_firehose_consumer(&self, frames: mpsc::Receiver<Vec<u8>>) -> JoinHandle<()> {
        FirehoseConsumer::new(self.indexers.clone()).spawn(frames)
    }

    /// Queue an outbound federation message for asynchronous delivery
    pub async fn enqueue_outbound(
        &self,
        target_base_url: &str,
        endpoint_path: &str,
        payload: serde_json::Value,
    ) -> Result<String> {
        let message = OutboxMessage::new(
            target_base_url,
            endpoint_path,
            "POST",
            payload,
            self.config.outbox_max_attempts,
        );
        let id = message.id.clone();
        self.outbox.enqueue(message).await?;
        Ok(id)
    }

    /// The identifier document this instance serves at
    /// `/.well-known/did.json`
    pub async fn own_did_document(&self) -> Result<DidDocument> {
        let keypair = self.keystore.signing_key(&self.config.instance_did).await?;

        let mut document = DidDocument::new(&self.config.instance_did)?;
        document.also_known_as = vec![format!("coop://{}", self.config.handle)];
        document.verification_method.push(VerificationMethod {
            id: format!("{}#{}", self.config.instance_did, FEDERATION_KEY_FRAGMENT),
            type_: "Multikey".to_string(),
            controller: self.config.instance_did.clone(),
            public_key_multibase: coopnet_crypto::encode_public_key(&keypair.public_key()),
        });
        document.service.push(Service {
            id: FEDERATION_SERVICE_ID.to_string(),
            type_: FEDERATION_SERVICE_TYPE.to_string(),
            service_endpoint: self.config.public_url.clone(),
        });

        Ok(document)
    }
}
