//! Topology-agnostic federation client
//!
//! Business services perform every cross-instance operation through one
//! interface. The Local implementation dispatches in process for
//! standalone deployments; the HTTP implementation resolves the
//! counterparty's identifier document and issues signed requests to its
//! federation endpoint.

pub mod http;
pub mod local;
pub mod receiver;
pub mod state;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use http::HttpFederationClient;
pub use local::LocalFederationClient;
pub use receiver::{
    dispatch_post, FederationReceiver, AGREEMENT_SIGNATURE_PATH, AGREEMENT_SIGN_REQUEST_PATH,
    COOP_SEARCH_PATH, HUB_NOTIFY_PATH, HUB_REGISTER_PATH, MEMBERSHIP_APPROVE_PATH,
    MEMBERSHIP_REQUEST_PATH,
};
pub use state::{MemoryStateTokenStore, StateTokenStore};
pub use types::{
    AgreementSignature, AgreementSignatureRequest, CoopProfile, EntityProfile, HubNotification,
    HubRegistration, MembershipApproval, MembershipRequest, SignatureAction,
};

/// Federation client errors
#[derive(Error, Debug)]
pub enum ClientError {
    /// Counterparty identifier could not be resolved
    #[error("Resolution failed: {0}")]
    Resolution(String),

    /// Counterparty document declares no federation service
    #[error("No federation service endpoint for {0}")]
    MissingEndpoint(String),

    /// The remote instance answered with a non-2xx status
    #[error("Delivery failed with HTTP {status}: {body}")]
    Delivery { status: u16, body: String },

    /// The request never reached the remote instance
    #[error("Transport error: {0}")]
    Transport(String),

    /// Request signing failed
    #[error("Signing failed: {0}")]
    Signing(String),

    /// The local receiver rejected the operation
    #[error("{0}")]
    Receiver(String),
}

/// Result type for federation client operations
pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Cross-instance operations, identical in both topologies
#[async_trait]
pub trait FederationClient: Send + Sync {
    /// Resolve an identifier's public profile
    async fn resolve_entity(&self, did: &str) -> ClientResult<EntityProfile>;

    /// Ask a cooperative to admit a member
    async fn request_membership(
        &self,
        coop_did: &str,
        request: MembershipRequest,
    ) -> ClientResult<()>;

    /// Tell a member's instance their membership was approved
    async fn approve_membership(
        &self,
        member_did: &str,
        approval: MembershipApproval,
    ) -> ClientResult<()>;

    /// Ask a party to sign an agreement
    async fn request_signature(
        &self,
        signer_did: &str,
        request: AgreementSignatureRequest,
    ) -> ClientResult<()>;

    /// Deliver a produced signature to the requesting party
    async fn submit_signature(
        &self,
        counterparty_did: &str,
        signature: AgreementSignature,
    ) -> ClientResult<()>;

    /// Decline a signature request
    async fn reject_signature(
        &self,
        counterparty_did: &str,
        signature: AgreementSignature,
    ) -> ClientResult<()>;

    /// Withdraw a signature request before it was answered
    async fn cancel_signature(
        &self,
        counterparty_did: &str,
        signature: AgreementSignature,
    ) -> ClientResult<()>;

    /// Withdraw an already-submitted signature
    async fn retract_signature(
        &self,
        counterparty_did: &str,
        signature: AgreementSignature,
    ) -> ClientResult<()>;

    /// Register this instance with the hub
    async fn register_with_hub(&self, registration: HubRegistration) -> ClientResult<()>;

    /// Notify the hub of a local event
    async fn notify_hub(&self, notification: HubNotification) -> ClientResult<()>;

    /// Fetch a cooperative's public profile
    async fn fetch_coop_profile(&self, coop_did: &str) -> ClientResult<CoopProfile>;

    /// Search cooperative profiles on the hub
    async fn search_coop_profiles(&self, query: &str) -> ClientResult<Vec<CoopProfile>>;
}
