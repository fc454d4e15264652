//! Receiving-endpoint contract
//!
//! The HTTP routing layer lives outside this crate, but the endpoint
//! paths and the dispatch onto business services are owned here so both
//! client implementations and the receiving side agree on the wire.

use async_trait::async_trait;

use crate::types::{
    AgreementSignature, AgreementSignatureRequest, CoopProfile, EntityProfile, HubNotification,
    HubRegistration, MembershipApproval, MembershipRequest,
};
use crate::{ClientError, ClientResult};

/// `POST`: a member asks to join a cooperative hosted here
pub const MEMBERSHIP_REQUEST_PATH: &str = "/federation/membership/request";

/// `POST`: a cooperative approved a member hosted here
pub const MEMBERSHIP_APPROVE_PATH: &str = "/federation/membership/approve";

/// `POST`: a party asks an actor hosted here to sign an agreement
pub const AGREEMENT_SIGN_REQUEST_PATH: &str = "/federation/agreement/sign-request";

/// `POST`: a signature decision for an agreement tracked here
pub const AGREEMENT_SIGNATURE_PATH: &str = "/federation/agreement/signature";

/// `POST`: a member instance registers with this hub
pub const HUB_REGISTER_PATH: &str = "/federation/hub/register";

/// `POST`: a member instance notifies this hub of an event
pub const HUB_NOTIFY_PATH: &str = "/federation/hub/notify";

/// `GET`: public cooperative profile search on a hub
pub const COOP_SEARCH_PATH: &str = "/federation/coop/search";

/// `GET`: public profile of an entity hosted here
pub fn entity_path(did: &str) -> String {
    format!("/federation/entity/{}", did)
}

/// `GET`: public profile of a cooperative hosted here
pub fn coop_profile_path(did: &str) -> String {
    format!("/federation/coop/{}/profile", did)
}

/// Business-service surface behind the receiving endpoints
///
/// Implemented by the platform's services layer; invoked either directly
/// by the Local client or by the routing layer once a signed request has
/// been verified.
#[async_trait]
pub trait FederationReceiver: Send + Sync {
    async fn receive_membership_request(&self, request: MembershipRequest) -> ClientResult<()>;

    async fn receive_membership_approval(&self, approval: MembershipApproval) -> ClientResult<()>;

    async fn receive_signature_request(
        &self,
        request: AgreementSignatureRequest,
    ) -> ClientResult<()>;

    async fn receive_signature(&self, signature: AgreementSignature) -> ClientResult<()>;

    async fn receive_hub_registration(&self, registration: HubRegistration) -> ClientResult<()>;

    async fn receive_hub_notification(&self, notification: HubNotification) -> ClientResult<()>;

    async fn entity_profile(&self, did: &str) -> ClientResult<EntityProfile>;

    async fn coop_profile(&self, did: &str) -> ClientResult<CoopProfile>;

    async fn search_coop_profiles(&self, query: &str) -> ClientResult<Vec<CoopProfile>>;
}

/// Dispatch a verified POST body onto the receiver by endpoint path
pub async fn dispatch_post(
    receiver: &dyn FederationReceiver,
    path: &str,
    body: &[u8],
) -> ClientResult<()> {
    match path {
        MEMBERSHIP_REQUEST_PATH => {
            receiver.receive_membership_request(parse(body)?).await
        }
        MEMBERSHIP_APPROVE_PATH => {
            receiver.receive_membership_approval(parse(body)?).await
        }
        AGREEMENT_SIGN_REQUEST_PATH => {
            receiver.receive_signature_request(parse(body)?).await
        }
        AGREEMENT_SIGNATURE_PATH => receiver.receive_signature(parse(body)?).await,
        HUB_REGISTER_PATH => receiver.receive_hub_registration(parse(body)?).await,
        HUB_NOTIFY_PATH => receiver.receive_hub_notification(parse(body)?).await,
        other => Err(ClientError::Receiver(format!(
            "Unknown federation endpoint: {}",
            other
        ))),
    }
}

fn parse<T: serde::de::DeserializeOwned>(body: &[u8]) -> ClientResult<T> {
    serde_json::from_slice(body)
        .map_err(|e| ClientError::Receiver(format!("Malformed payload: {}", e)))
}
