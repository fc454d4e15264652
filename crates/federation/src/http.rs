//! HTTP federation client
//!
//! Federated topology: the counterparty's identifier document is resolved,
//! its federation service endpoint extracted, and the operation delivered
//! as a signed request to the fixed receiving path on that endpoint.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use coopnet_identity::{DidResolver, Keystore, FEDERATION_KEY_FRAGMENT};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::receiver::{
    coop_profile_path, entity_path, AGREEMENT_SIGNATURE_PATH, AGREEMENT_SIGN_REQUEST_PATH,
    COOP_SEARCH_PATH, HUB_NOTIFY_PATH, HUB_REGISTER_PATH, MEMBERSHIP_APPROVE_PATH,
    MEMBERSHIP_REQUEST_PATH,
};
use crate::types::{
    AgreementSignature, AgreementSignatureRequest, CoopProfile, EntityProfile, HubNotification,
    HubRegistration, MembershipApproval, MembershipRequest,
};
use crate::{ClientError, ClientResult, FederationClient};

/// Longest error-body excerpt carried in a delivery error
const ERROR_EXCERPT_LEN: usize = 512;

/// Signed HTTP dispatch to remote instances
pub struct HttpFederationClient {
    resolver: Arc<dyn DidResolver>,
    keystore: Arc<Keystore>,
    instance_did: String,
    hub_did: Option<String>,
    client: reqwest::Client,
}

impl HttpFederationClient {
    /// Create an HTTP client signing as the given instance identifier
    pub fn new(
        resolver: Arc<dyn DidResolver>,
        keystore: Arc<Keystore>,
        instance_did: String,
        hub_did: Option<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            resolver,
            keystore,
            instance_did,
            hub_did,
            client,
        }
    }

    /// Resolve a counterparty's federation endpoint
    async fn endpoint_for(&self, did: &str) -> ClientResult<String> {
        let document = self
            .resolver
            .resolve(did)
            .await
            .map_err(|e| ClientError::Resolution(e.to_string()))?;

        document
            .federation_endpoint()
            .map(|e| e.trim_end_matches('/').to_string())
            .ok_or_else(|| ClientError::MissingEndpoint(did.to_string()))
    }

    fn hub_did(&self) -> ClientResult<&str> {
        self.hub_did
            .as_deref()
            .ok_or_else(|| ClientError::Resolution("No hub configured for this instance".into()))
    }

    /// Deliver a signed POST to a counterparty's receiving path
    async fn post_signed<T: Serialize>(
        &self,
        target_did: &str,
        path: &str,
        payload: &T,
    ) -> ClientResult<()> {
        let endpoint = self.endpoint_for(target_did).await?;
        let url = format!("{}{}", endpoint, path);
        let body = serde_json::to_vec(payload)
            .map_err(|e| ClientError::Transport(format!("Unserializable payload: {}", e)))?;

        let keypair = self
            .keystore
            .signing_key(&self.instance_did)
            .await
            .map_err(|e| ClientError::Signing(e.to_string()))?;
        let key_id = format!("{}#{}", self.instance_did, FEDERATION_KEY_FRAGMENT);

        let signed_headers = coopnet_httpsig::sign("POST", &url, Some(&body), &keypair, &key_id)
            .map_err(|e| ClientError::Signing(e.to_string()))?;

        debug!(target = %target_did, url = %url, "Sending signed federation request");

        let mut request = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .body(body);
        for (name, value) in signed_headers {
            request = request.header(name, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body: String = response
            .text()
            .await
            .unwrap_or_default()
            .chars()
            .take(ERROR_EXCERPT_LEN)
            .collect();
        Err(ClientError::Delivery {
            status: status.as_u16(),
            body,
        })
    }

    /// Fetch JSON from a counterparty's public (unauthenticated) path
    async fn get_json<T: DeserializeOwned>(&self, target_did: &str, path: &str) -> ClientResult<T> {
        let endpoint = self.endpoint_for(target_did).await?;
        let url = format!("{}{}", endpoint, path);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(ERROR_EXCERPT_LEN)
                .collect();
            return Err(ClientError::Delivery {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Transport(format!("Malformed response: {}", e)))
    }
}

#[async_trait]
impl FederationClient for HttpFederationClient {
    async fn resolve_entity(&self, did: &str) -> ClientResult<EntityProfile> {
        self.get_json(did, &entity_path(did)).await
    }

    async fn request_membership(
        &self,
        coop_did: &str,
        request: MembershipRequest,
    ) -> ClientResult<()> {
        self.post_signed(coop_did, MEMBERSHIP_REQUEST_PATH, &request)
            .await
    }

    async fn approve_membership(
        &self,
        member_did: &str,
        approval: MembershipApproval,
    ) -> ClientResult<()> {
        self.post_signed(member_did, MEMBERSHIP_APPROVE_PATH, &approval)
            .await
    }

    async fn request_signature(
        &self,
        signer_did: &str,
        request: AgreementSignatureRequest,
    ) -> ClientResult<()> {
        self.post_signed(signer_did, AGREEMENT_SIGN_REQUEST_PATH, &request)
            .await
    }

    async fn submit_signature(
        &self,
        counterparty_did: &str,
        signature: AgreementSignature,
    ) -> ClientResult<()> {
        self.post_signed(counterparty_did, AGREEMENT_SIGNATURE_PATH, &signature)
            .await
    }

    async fn reject_signature(
        &self,
        counterparty_did: &str,
        signature: AgreementSignature,
    ) -> ClientResult<()> {
        self.post_signed(counterparty_did, AGREEMENT_SIGNATURE_PATH, &signature)
            .await
    }

    async fn cancel_signature(
        &self,
        counterparty_did: &str,
        signature: AgreementSignature,
    ) -> ClientResult<()> {
        self.post_signed(counterparty_did, AGREEMENT_SIGNATURE_PATH, &signature)
            .await
    }

    async fn retract_signature(
        &self,
        counterparty_did: &str,
        signature: AgreementSignature,
    ) -> ClientResult<()> {
        self.post_signed(counterparty_did, AGREEMENT_SIGNATURE_PATH, &signature)
            .await
    }

    async fn register_with_hub(&self, registration: HubRegistration) -> ClientResult<()> {
        let hub = self.hub_did()?.to_string();
        self.post_signed(&hub, HUB_REGISTER_PATH, &registration)
            .await
    }

    async fn notify_hub(&self, notification: HubNotification) -> ClientResult<()> {
        let hub = self.hub_did()?.to_string();
        self.post_signed(&hub, HUB_NOTIFY_PATH, &notification).await
    }

    async fn fetch_coop_profile(&self, coop_did: &str) -> ClientResult<CoopProfile> {
        self.get_json(coop_did, &coop_profile_path(coop_did)).await
    }

    async fn search_coop_profiles(&self, query: &str) -> ClientResult<Vec<CoopProfile>> {
        let hub = self.hub_did()?.to_string();
        let path = format!("{}?q={}", COOP_SEARCH_PATH, urlencode(query));
        self.get_json(&hub, &path).await
    }
}

/// Minimal percent-encoding for the search query parameter
fn urlencode(value: &str) -> String {
    value
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            other => format!("%{:02X}", other),
        })
        .collect()
}
