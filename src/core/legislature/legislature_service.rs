// Legislature - bills, committees, and floor votes.
//
// Bill lifecycle:
//
//   Introduced -> InCommittee -> OnFloor -> Passed -> Signed
//        \------------------------^  \        \-> Vetoed
//                                     \-> Failed
//
// Every transition goes through one table so an illegal move is a typed
// error naming both states instead of a silently weird status string.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::core::citizenship::{self, CitizenshipError};
use crate::core::registry::{RegistryError, RegistryService, RegistryStore};

// ============================================================================
// DOMAIN MODELS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BillStatus {
    Introduced,
    InCommittee,
    OnFloor,
    Passed,
    Failed,
    Signed,
    Vetoed,
}

impl BillStatus {
    /// The single transition table for the bill lifecycle.
    pub fn can_transition(self, next: BillStatus) -> bool {
        use BillStatus::*;
        matches!(
            (self, next),
            (Introduced, InCommittee)
                | (Introduced, OnFloor)
                | (InCommittee, OnFloor)
                | (OnFloor, Passed)
                | (OnFloor, Failed)
                | (Passed, Signed)
                | (Passed, Vetoed)
        )
    }
}

impl std::fmt::Display for BillStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BillStatus::Introduced => "Introduced",
            BillStatus::InCommittee => "In Committee",
            BillStatus::OnFloor => "On Floor",
            BillStatus::Passed => "Passed",
            BillStatus::Failed => "Failed",
            BillStatus::Signed => "Signed",
            BillStatus::Vetoed => "Vetoed",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub at: DateTime<Utc>,
    pub event: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bill {
    pub id: String,
    pub title: String,
    pub text: String,
    pub sponsor_id: u64,
    pub status: BillStatus,
    /// Committee the bill is referred to while `InCommittee`.
    pub committee: Option<String>,
    pub introduced_at: DateTime<Utc>,
    pub history: Vec<HistoryEntry>,
}

impl Bill {
    fn record(&mut self, event: impl Into<String>) {
        self.history.push(HistoryEntry {
            at: Utc::now(),
            event: event.into(),
        });
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Committee {
    pub name: String,
    pub chair_id: u64,
    pub member_ids: Vec<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ballot {
    Yea,
    Nay,
    Present,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloorVote {
    pub bill_id: String,
    pub ballots: BTreeMap<u64, Ballot>,
    pub opened_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteTally {
    pub yea: usize,
    pub nay: usize,
    pub present: usize,
    pub quorum_met: bool,
    pub passed: bool,
}

// ============================================================================
// VOTE TALLYING
// ============================================================================

/// Tally a ballot map. Passage requires a quorum of total ballots cast
/// (Present counts toward quorum, not toward passage) and strictly more
/// Yeas than Nays.
pub fn tally_ballots(ballots: &BTreeMap<u64, Ballot>, quorum: usize) -> VoteTally {
    let mut yea = 0;
    let mut nay = 0;
    let mut present = 0;
    for ballot in ballots.values() {
        match ballot {
            Ballot::Yea => yea += 1,
            Ballot::Nay => nay += 1,
            Ballot::Present => present += 1,
        }
    }
    let quorum_met = ballots.len() >= quorum;
    VoteTally {
        yea,
        nay,
        present,
        quorum_met,
        passed: quorum_met && yea > nay,
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum LegislatureError {
    #[error("No bill with id {0}")]
    UnknownBill(String),

    #[error("Bill is {from}; cannot move to {to}")]
    InvalidTransition { from: BillStatus, to: BillStatus },

    #[error("No committee named {0}")]
    UnknownCommittee(String),

    #[error("A committee named {0} already exists")]
    CommitteeExists(String),

    #[error("No floor vote is open for bill {0}")]
    NoOpenVote(String),

    #[error("A floor vote is already open for bill {0}")]
    VoteAlreadyOpen(String),

    #[error(transparent)]
    Citizenship(#[from] CitizenshipError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct LegislatureConfig {
    /// Minimum ballots cast for a floor vote to count.
    pub quorum: usize,
}

impl Default for LegislatureConfig {
    fn default() -> Self {
        Self { quorum: 3 }
    }
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct LegislatureService<S: RegistryStore> {
    registry: Arc<RegistryService<S>>,
    config: LegislatureConfig,
}

impl<S: RegistryStore> LegislatureService<S> {
    pub fn new(registry: Arc<RegistryService<S>>) -> Self {
        Self {
            registry,
            config: LegislatureConfig::default(),
        }
    }

    pub fn new_with_config(registry: Arc<RegistryService<S>>, config: LegislatureConfig) -> Self {
        Self { registry, config }
    }

    /// Introduce a bill. The sponsor must be an active citizen.
    pub async fn introduce(
        &self,
        sponsor_id: u64,
        title: String,
        text: String,
    ) -> Result<Bill, LegislatureError> {
        self.registry
            .mutate(|reg| {
                let sponsor = citizenship::require_active(reg, sponsor_id)?;
                let sponsor_name = sponsor.name.clone();

                let id = reg.next_bill_id();
                let mut bill = Bill {
                    id: id.clone(),
                    title,
                    text,
                    sponsor_id,
                    status: BillStatus::Introduced,
                    committee: None,
                    introduced_at: Utc::now(),
                    history: Vec::new(),
                };
                bill.record(format!("Introduced by {}", sponsor_name));
                reg.bills.insert(id, bill.clone());
                Ok(bill)
            })
            .await
    }

    pub async fn create_committee(
        &self,
        name: String,
        chair_id: u64,
    ) -> Result<Committee, LegislatureError> {
        self.registry
            .mutate(|reg| {
                citizenship::require_active(reg, chair_id)?;
                if reg.committees.contains_key(&name) {
                    return Err(LegislatureError::CommitteeExists(name));
                }
                let committee = Committee {
                    name: name.clone(),
                    chair_id,
                    member_ids: vec![chair_id],
                };
                reg.committees.insert(name, committee.clone());
                Ok(committee)
            })
            .await
    }

    pub async fn assign_member(
        &self,
        committee: &str,
        user_id: u64,
    ) -> Result<Committee, LegislatureError> {
        self.registry
            .mutate(|reg| {
                citizenship::require_active(reg, user_id)?;
                let c = reg
                    .committees
                    .get_mut(committee)
                    .ok_or_else(|| LegislatureError::UnknownCommittee(committee.to_string()))?;
                if !c.member_ids.contains(&user_id) {
                    c.member_ids.push(user_id);
                }
                Ok(c.clone())
            })
            .await
    }

    /// Refer an introduced bill to a committee.
    pub async fn refer(&self, bill_id: &str, committee: &str) -> Result<Bill, LegislatureError> {
        self.registry
            .mutate(|reg| {
                if !reg.committees.contains_key(committee) {
                    return Err(LegislatureError::UnknownCommittee(committee.to_string()));
                }
                let bill = reg
                    .bills
                    .get_mut(bill_id)
                    .ok_or_else(|| LegislatureError::UnknownBill(bill_id.to_string()))?;
                Self::transition(bill, BillStatus::InCommittee)?;
                bill.committee = Some(committee.to_string());
                bill.record(format!("Referred to the {} committee", committee));
                Ok(bill.clone())
            })
            .await
    }

    /// Report a bill out of committee onto the floor calendar.
    pub async fn report_out(&self, bill_id: &str) -> Result<Bill, LegislatureError> {
        self.registry
            .mutate(|reg| {
                let bill = reg
                    .bills
                    .get_mut(bill_id)
                    .ok_or_else(|| LegislatureError::UnknownBill(bill_id.to_string()))?;
                Self::transition(bill, BillStatus::OnFloor)?;
                bill.committee = None;
                bill.record("Reported out of committee");
                Ok(bill.clone())
            })
            .await
    }

    /// Move an introduced bill straight to the floor, skipping committee.
    pub async fn to_floor(&self, bill_id: &str) -> Result<Bill, LegislatureError> {
        self.registry
            .mutate(|reg| {
                let bill = reg
                    .bills
                    .get_mut(bill_id)
                    .ok_or_else(|| LegislatureError::UnknownBill(bill_id.to_string()))?;
                Self::transition(bill, BillStatus::OnFloor)?;
                bill.record("Placed on the floor calendar");
                Ok(bill.clone())
            })
            .await
    }

    /// Open a floor vote on a bill that is on the floor.
    pub async fn open_floor_vote(&self, bill_id: &str) -> Result<FloorVote, LegislatureError> {
        self.registry
            .mutate(|reg| {
                let bill = reg
                    .bills
                    .get(bill_id)
                    .ok_or_else(|| LegislatureError::UnknownBill(bill_id.to_string()))?;
                if bill.status != BillStatus::OnFloor {
                    return Err(LegislatureError::InvalidTransition {
                        from: bill.status,
                        to: BillStatus::OnFloor,
                    });
                }
                if reg.floor_votes.contains_key(bill_id) {
                    return Err(LegislatureError::VoteAlreadyOpen(bill_id.to_string()));
                }
                let vote = FloorVote {
                    bill_id: bill_id.to_string(),
                    ballots: BTreeMap::new(),
                    opened_at: Utc::now(),
                };
                reg.floor_votes.insert(bill_id.to_string(), vote.clone());
                Ok(vote)
            })
            .await
    }

    /// Cast (or change) a ballot. The last ballot per voter counts.
    pub async fn cast_ballot(
        &self,
        bill_id: &str,
        voter_id: u64,
        ballot: Ballot,
    ) -> Result<(), LegislatureError> {
        self.registry
            .mutate(|reg| {
                citizenship::require_active(reg, voter_id)?;
                let vote = reg
                    .floor_votes
                    .get_mut(bill_id)
                    .ok_or_else(|| LegislatureError::NoOpenVote(bill_id.to_string()))?;
                vote.ballots.insert(voter_id, ballot);
                Ok(())
            })
            .await
    }

    /// Close the floor vote, tally it, and move the bill to Passed/Failed.
    pub async fn close_floor_vote(&self, bill_id: &str) -> Result<VoteTally, LegislatureError> {
        let quorum = self.config.quorum;
        self.registry
            .mutate(|reg| {
                let vote = reg
                    .floor_votes
                    .remove(bill_id)
                    .ok_or_else(|| LegislatureError::NoOpenVote(bill_id.to_string()))?;
                let tally = tally_ballots(&vote.ballots, quorum);

                let bill = reg
                    .bills
                    .get_mut(bill_id)
                    .ok_or_else(|| LegislatureError::UnknownBill(bill_id.to_string()))?;
                let next = if tally.passed {
                    BillStatus::Passed
                } else {
                    BillStatus::Failed
                };
                Self::transition(bill, next)?;
                bill.record(format!(
                    "Floor vote closed: {} yea / {} nay / {} present{}",
                    tally.yea,
                    tally.nay,
                    tally.present,
                    if tally.quorum_met {
                        ""
                    } else {
                        " (quorum not met)"
                    }
                ));
                Ok(tally)
            })
            .await
    }

    pub async fn sign(&self, bill_id: &str) -> Result<Bill, LegislatureError> {
        self.finalize(bill_id, BillStatus::Signed, "Signed into law").await
    }

    pub async fn veto(&self, bill_id: &str) -> Result<Bill, LegislatureError> {
        self.finalize(bill_id, BillStatus::Vetoed, "Vetoed").await
    }

    pub async fn bill(&self, bill_id: &str) -> Result<Bill, LegislatureError> {
        self.registry
            .read(|reg| reg.bills.get(bill_id).cloned())
            .await
            .ok_or_else(|| LegislatureError::UnknownBill(bill_id.to_string()))
    }

    /// Bills in a given status, oldest first.
    pub async fn docket(&self, status: BillStatus) -> Vec<Bill> {
        let mut bills = self
            .registry
            .read(|reg| {
                reg.bills
                    .values()
                    .filter(|b| b.status == status)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .await;
        bills.sort_by_key(|b| b.introduced_at);
        bills
    }

    pub async fn committee(&self, name: &str) -> Result<Committee, LegislatureError> {
        self.registry
            .read(|reg| reg.committees.get(name).cloned())
            .await
            .ok_or_else(|| LegislatureError::UnknownCommittee(name.to_string()))
    }

    async fn finalize(
        &self,
        bill_id: &str,
        to: BillStatus,
        event: &str,
    ) -> Result<Bill, LegislatureError> {
        self.registry
            .mutate(|reg| {
                let bill = reg
                    .bills
                    .get_mut(bill_id)
                    .ok_or_else(|| LegislatureError::UnknownBill(bill_id.to_string()))?;
                Self::transition(bill, to)?;
                bill.record(event);
                Ok(bill.clone())
            })
            .await
    }

    fn transition(bill: &mut Bill, to: BillStatus) -> Result<(), LegislatureError> {
        if !bill.status.can_transition(to) {
            return Err(LegislatureError::InvalidTransition {
                from: bill.status,
                to,
            });
        }
        bill.status = to;
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::citizenship::CitizenshipService;
    use crate::infra::registry::InMemoryRegistryStore;

    async fn setup() -> (
        LegislatureService<InMemoryRegistryStore>,
        CitizenshipService<InMemoryRegistryStore>,
    ) {
        let registry = Arc::new(
            RegistryService::new(InMemoryRegistryStore::new())
                .await
                .unwrap(),
        );
        let citizenship = CitizenshipService::new(Arc::clone(&registry));
        for (id, name) in [(1, "Ada"), (2, "Bob"), (3, "Eve"), (4, "Mal")] {
            citizenship
                .register(id, name.to_string(), "Columbia".to_string())
                .await
                .unwrap();
        }
        (LegislatureService::new(registry), citizenship)
    }

    #[test]
    fn test_tally_requires_quorum_and_majority() {
        let mut ballots = BTreeMap::new();
        ballots.insert(1, Ballot::Yea);
        ballots.insert(2, Ballot::Yea);
        ballots.insert(3, Ballot::Nay);

        let tally = tally_ballots(&ballots, 3);
        assert_eq!((tally.yea, tally.nay, tally.present), (2, 1, 0));
        assert!(tally.passed);

        // Same ballots, higher quorum: fails.
        let tally = tally_ballots(&ballots, 5);
        assert!(!tally.quorum_met);
        assert!(!tally.passed);
    }

    #[test]
    fn test_tally_present_counts_toward_quorum_only() {
        let mut ballots = BTreeMap::new();
        ballots.insert(1, Ballot::Yea);
        ballots.insert(2, Ballot::Present);
        ballots.insert(3, Ballot::Present);

        let tally = tally_ballots(&ballots, 3);
        assert!(tally.quorum_met);
        assert!(tally.passed); // 1 yea > 0 nay

        let mut tied = BTreeMap::new();
        tied.insert(1, Ballot::Yea);
        tied.insert(2, Ballot::Nay);
        tied.insert(3, Ballot::Present);
        // A yea/nay tie does not pass.
        assert!(!tally_ballots(&tied, 3).passed);
    }

    #[tokio::test]
    async fn test_suspended_citizen_cannot_sponsor() {
        let (legislature, citizenship) = setup().await;
        citizenship.suspend(1).await.unwrap();

        let err = legislature
            .introduce(1, "A Bill".to_string(), "Text".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, LegislatureError::Citizenship(_)));
    }

    #[tokio::test]
    async fn test_full_bill_lifecycle() {
        let (legislature, _) = setup().await;

        let bill = legislature
            .introduce(1, "Ferret Act".to_string(), "Sec. 1. Ferrets.".to_string())
            .await
            .unwrap();
        assert_eq!(bill.id, "B-1");
        assert_eq!(bill.status, BillStatus::Introduced);

        legislature
            .create_committee("Judiciary".to_string(), 2)
            .await
            .unwrap();
        legislature.refer("B-1", "Judiciary").await.unwrap();
        legislature.report_out("B-1").await.unwrap();

        legislature.open_floor_vote("B-1").await.unwrap();
        legislature.cast_ballot("B-1", 1, Ballot::Yea).await.unwrap();
        legislature.cast_ballot("B-1", 2, Ballot::Yea).await.unwrap();
        legislature.cast_ballot("B-1", 3, Ballot::Nay).await.unwrap();

        let tally = legislature.close_floor_vote("B-1").await.unwrap();
        assert!(tally.passed);

        let bill = legislature.sign("B-1").await.unwrap();
        assert_eq!(bill.status, BillStatus::Signed);
        assert!(bill.history.iter().any(|h| h.event == "Signed into law"));
    }

    #[tokio::test]
    async fn test_illegal_transition_is_rejected() {
        let (legislature, _) = setup().await;
        legislature
            .introduce(1, "Ferret Act".to_string(), "Text".to_string())
            .await
            .unwrap();

        // Signing an Introduced bill skips the whole process.
        let err = legislature.sign("B-1").await.unwrap_err();
        assert!(matches!(
            err,
            LegislatureError::InvalidTransition {
                from: BillStatus::Introduced,
                to: BillStatus::Signed,
            }
        ));
    }

    #[tokio::test]
    async fn test_revote_replaces_ballot() {
        let (legislature, _) = setup().await;
        legislature
            .introduce(1, "Ferret Act".to_string(), "Text".to_string())
            .await
            .unwrap();
        legislature.to_floor("B-1").await.unwrap();
        legislature.open_floor_vote("B-1").await.unwrap();

        legislature.cast_ballot("B-1", 1, Ballot::Nay).await.unwrap();
        legislature.cast_ballot("B-1", 1, Ballot::Yea).await.unwrap();
        legislature.cast_ballot("B-1", 2, Ballot::Yea).await.unwrap();
        legislature.cast_ballot("B-1", 3, Ballot::Present).await.unwrap();

        let tally = legislature.close_floor_vote("B-1").await.unwrap();
        assert_eq!((tally.yea, tally.nay), (2, 0));
        assert!(tally.passed);
    }

    #[tokio::test]
    async fn test_only_one_open_vote_per_bill() {
        let (legislature, _) = setup().await;
        legislature
            .introduce(1, "Ferret Act".to_string(), "Text".to_string())
            .await
            .unwrap();
        legislature.to_floor("B-1").await.unwrap();
        legislature.open_floor_vote("B-1").await.unwrap();

        assert!(matches!(
            legislature.open_floor_vote("B-1").await.unwrap_err(),
            LegislatureError::VoteAlreadyOpen(_)
        ));
    }
}
