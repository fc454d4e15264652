//! Two-sided membership materialization
//!
//! A membership is the join of two independently authored assertions: a
//! request by the member and an approval by the cooperative. They may
//! arrive in either order and must converge to one row per pairing.
//! Rows are never physically deleted; a closed pairing is invalidated by
//! timestamp so history is retained.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use coopnet_common::Result;
use coopnet_firehose::{ChangeAction, ChangeEvent};
use coopnet_storage::{Storage, StorageExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::notify::{ChangeNotifier, Notification};
use crate::{RecordIndexer, COLLECTION_MEMBERSHIP_APPROVAL, COLLECTION_MEMBERSHIP_REQUEST};

/// Materialized membership state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipStatus {
    /// One side is present, the other outstanding
    Pending,
    /// Both assertions present
    Active,
    /// The cooperative's approval was withdrawn
    Suspended,
    /// The member's request was withdrawn
    Departed,
}

/// One materialized membership row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipView {
    pub id: String,
    pub member_did: String,
    pub coop_did: String,
    pub status: MembershipStatus,
    pub roles: Vec<String>,
    pub request_uri: Option<String>,
    pub approval_uri: Option<String>,
    pub requested_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub invalidated_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

enum Side {
    Request,
    Approval,
}

/// Indexer for the two membership collections
pub struct MembershipIndexer {
    storage: Arc<dyn Storage>,
    notifier: Arc<ChangeNotifier>,
}

impl MembershipIndexer {
    /// Create a membership indexer over the given storage
    pub fn new(storage: Arc<dyn Storage>, notifier: Arc<ChangeNotifier>) -> Self {
        Self { storage, notifier }
    }

    /// The current (not invalidated) row for a pairing, if any
    pub async fn current(&self, coop_did: &str, member_did: &str) -> Result<Option<MembershipView>> {
        let row_id: Option<String> = self.storage.get(&index_key(coop_did, member_did)).await?;
        match row_id {
            Some(row_id) => self.storage.get(&row_key(&row_id)).await,
            None => Ok(None),
        }
    }

    /// Every row ever materialized for a cooperative, history included
    pub async fn history(&self, coop_did: &str) -> Result<Vec<MembershipView>> {
        let mut rows = Vec::new();
        for key in self.storage.list_keys("memberships/rows/").await? {
            if let Some(row) = self.storage.get::<MembershipView>(&key).await? {
                if row.coop_did == coop_did {
                    rows.push(row);
                }
            }
        }
        Ok(rows)
    }

    async fn upsert_side(&self, side: Side, event: &ChangeEvent) -> Result<()> {
        let record = match &event.record {
            Some(record) => record,
            None => {
                warn!(location = %event.location, "Membership assertion without record payload");
                return Ok(());
            }
        };

        let (member_did, coop_did) = match (string_field(record, "member"), string_field(record, "coop")) {
            (Some(member), Some(coop)) => (member, coop),
            _ => {
                warn!(location = %event.location, "Membership assertion missing member or coop");
                return Ok(());
            }
        };

        let existing = self.current(&coop_did, &member_did).await?;
        let mut row = existing.unwrap_or_else(|| MembershipView {
            id: Uuid::new_v4().to_string(),
            member_did: member_did.clone(),
            coop_did: coop_did.clone(),
            status: MembershipStatus::Pending,
            roles: Vec::new(),
            request_uri: None,
            approval_uri: None,
            requested_at: None,
            approved_at: None,
            invalidated_at: None,
            updated_at: event.time,
        });
        let previous_status = row.status;

        match side {
            Side::Request => {
                row.request_uri = Some(event.location.clone());
                row.requested_at = Some(event.time);
            }
            Side::Approval => {
                row.approval_uri = Some(event.location.clone());
                row.approved_at = Some(event.time);
                if let Some(roles) = record.get("roles").and_then(|r| r.as_array()) {
                    row.roles = roles
                        .iter()
                        .filter_map(|r| r.as_str().map(str::to_string))
                        .collect();
                }
            }
        }

        // Active only once both assertions are present
        row.status = if row.request_uri.is_some() && row.approval_uri.is_some() {
            MembershipStatus::Active
        } else {
            MembershipStatus::Pending
        };
        row.updated_at = event.time;

        self.storage.put(&row_key(&row.id), &row).await?;
        self.storage
            .put(&index_key(&coop_did, &member_did), &row.id)
            .await?;

        if previous_status != MembershipStatus::Active && row.status == MembershipStatus::Active {
            info!(member = %member_did, coop = %coop_did, "Membership activated");
            self.notifier.emit(Notification::MembershipActivated {
                member_did,
                coop_did,
                roles: row.roles.clone(),
            });
        }

        Ok(())
    }

    async fn withdraw_side(&self, side: Side, event: &ChangeEvent) -> Result<()> {
        let mut row = match self.find_by_side_uri(&side, &event.location).await? {
            Some(row) => row,
            None => {
                debug!(location = %event.location, "Withdrawal for an unknown or settled assertion");
                return Ok(());
            }
        };

        match side {
            Side::Request => {
                // The member left: the pairing is closed, a later request
                // starts a fresh row
                row.status = MembershipStatus::Departed;
                row.invalidated_at = Some(Utc::now());
                self.storage
                    .delete(&index_key(&row.coop_did, &row.member_did))
                    .await?;
            }
            Side::Approval => {
                // The cooperative withdrew its approval: membership lapses
                // but the pairing stays open for re-approval
                row.status = MembershipStatus::Suspended;
                row.approval_uri = None;
            }
        }
        row.updated_at = Utc::now();

        info!(member = %row.member_did, coop = %row.coop_did, status = ?row.status, "Membership assertion withdrawn");
        self.storage.put(&row_key(&row.id), &row).await
    }

    async fn find_by_side_uri(&self, side: &Side, location: &str) -> Result<Option<MembershipView>> {
        for key in self.storage.list_keys("memberships/rows/").await? {
            if let Some(row) = self.storage.get::<MembershipView>(&key).await? {
                if row.invalidated_at.is_some() {
                    continue;
                }
                let side_uri = match side {
                    Side::Request => row.request_uri.as_deref(),
                    Side::Approval => row.approval_uri.as_deref(),
                };
                if side_uri == Some(location) {
                    return Ok(Some(row));
                }
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl RecordIndexer for MembershipIndexer {
    fn collections(&self) -> &'static [&'static str] {
        &[COLLECTION_MEMBERSHIP_REQUEST, COLLECTION_MEMBERSHIP_APPROVAL]
    }

    async fn apply(&self, event: &ChangeEvent) -> Result<()> {
        let side = match event.collection() {
            Some(COLLECTION_MEMBERSHIP_REQUEST) => Side::Request,
            Some(COLLECTION_MEMBERSHIP_APPROVAL) => Side::Approval,
            _ => return Ok(()),
        };

        match event.action {
            ChangeAction::Create | ChangeAction::Update => self.upsert_side(side, event).await,
            ChangeAction::Delete => self.withdraw_side(side, event).await,
        }
    }
}

fn row_key(id: &str) -> String {
    format!("memberships/rows/{}", id)
}

fn index_key(coop_did: &str, member_did: &str) -> String {
    format!("memberships/current/{}/{}", coop_did, member_did)
}

fn string_field(record: &serde_json::Value, field: &str) -> Option<String> {
    record.get(field).and_then(|v| v.as_str()).map(str::to_string)
}
