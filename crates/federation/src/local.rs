//! Local federation client
//!
//! Standalone topology: this instance is the only instance, so every
//! operation dispatches directly onto the local services. Hub
//! registration and notification have no counterparty and are no-ops.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::receiver::FederationReceiver;
use crate::types::{
    AgreementSignature, AgreementSignatureRequest, CoopProfile, EntityProfile, HubNotification,
    HubRegistration, MembershipApproval, MembershipRequest,
};
use crate::{ClientResult, FederationClient};

/// Direct in-process dispatch onto the local services
pub struct LocalFederationClient {
    receiver: Arc<dyn FederationReceiver>,
}

impl LocalFederationClient {
    /// Create a local client over the platform's service surface
    pub fn new(receiver: Arc<dyn FederationReceiver>) -> Self {
        Self { receiver }
    }
}

#[async_trait]
impl FederationClient for LocalFederationClient {
    async fn resolve_entity(&self, did: &str) -> ClientResult<EntityProfile> {
        self.receiver.entity_profile(did).await
    }

    async fn request_membership(
        &self,
        _coop_did: &str,
        request: MembershipRequest,
    ) -> ClientResult<()> {
        self.receiver.receive_membership_request(request).await
    }

    async fn approve_membership(
        &self,
        _member_did: &str,
        approval: MembershipApproval,
    ) -> ClientResult<()> {
        self.receiver.receive_membership_approval(approval).await
    }

    async fn request_signature(
        &self,
        _signer_did: &str,
        request: AgreementSignatureRequest,
    ) -> ClientResult<()> {
        self.receiver.receive_signature_request(request).await
    }

    async fn submit_signature(
        &self,
        _counterparty_did: &str,
        signature: AgreementSignature,
    ) -> ClientResult<()> {
        self.receiver.receive_signature(signature).await
    }

    async fn reject_signature(
        &self,
        _counterparty_did: &str,
        signature: AgreementSignature,
    ) -> ClientResult<()> {
        self.receiver.receive_signature(signature).await
    }

    async fn cancel_signature(
        &self,
        _counterparty_did: &str,
        signature: AgreementSignature,
    ) -> ClientResult<()> {
        self.receiver.receive_signature(signature).await
    }

    async fn retract_signature(
        &self,
        _counterparty_did: &str,
        signature: AgreementSignature,
    ) -> ClientResult<()> {
        self.receiver.receive_signature(signature).await
    }

    async fn register_with_hub(&self, registration: HubRegistration) -> ClientResult<()> {
        debug!(instance = %registration.instance_did, "Standalone topology, hub registration skipped");
        Ok(())
    }

    async fn notify_hub(&self, notification: HubNotification) -> ClientResult<()> {
        debug!(event = %notification.event, "Standalone topology, hub notification skipped");
        Ok(())
    }

    async fn fetch_coop_profile(&self, coop_did: &str) -> ClientResult<CoopProfile> {
        self.receiver.coop_profile(coop_did).await
    }

    async fn search_coop_profiles(&self, query: &str) -> ClientResult<Vec<CoopProfile>> {
        self.receiver.search_coop_profiles(query).await
    }
}
