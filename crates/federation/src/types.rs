//! Federation payload types
//!
//! Everything that crosses an instance boundary is serde camelCase JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Public profile of any federated actor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityProfile {
    pub did: String,
    pub handle: String,
    /// `person` or `coop`
    pub entity_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Public profile of a cooperative
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoopProfile {
    pub did: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_count: Option<u32>,
}

/// A member's assertion that it wants to join a cooperative
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipRequest {
    pub member_did: String,
    pub coop_did: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub requested_at: DateTime<Utc>,
}

/// A cooperative's assertion that it admits a member
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipApproval {
    pub member_did: String,
    pub coop_did: String,
    pub roles: Vec<String>,
    pub approved_at: DateTime<Utc>,
}

/// A request for a party to sign an agreement
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgreementSignatureRequest {
    pub agreement: String,
    pub requester_did: String,
    pub signer_did: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub requested_at: DateTime<Utc>,
}

/// What happened to a signature request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureAction {
    /// The signer produced a signature
    Submitted,
    /// The signer declined
    Rejected,
    /// The requester withdrew the request
    Cancelled,
    /// The signer withdrew an earlier signature
    Retracted,
}

/// A signature decision travelling between instances
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgreementSignature {
    pub agreement: String,
    pub signer_did: String,
    pub action: SignatureAction,
    /// Multibase signature bytes, present when `action` is `submitted`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Registration of a member instance with the hub
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HubRegistration {
    pub instance_did: String,
    pub base_url: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub registered_at: DateTime<Utc>,
}

/// An event a member instance reports to the hub
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HubNotification {
    pub instance_did: String,
    pub event: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    pub emitted_at: DateTime<Utc>,
}
