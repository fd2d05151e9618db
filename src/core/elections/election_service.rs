// Electoral contests: schedule, open the polls, vote, close, tally.
//
// Ties are reported, never coin-flipped - a tied contest gets a runoff
// scheduled by whoever runs the election, not by the bot.

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
pub enum ContestStatus {
    Scheduled,
    Open,
    Closed,
}

impl std::fmt::Display for ContestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContestStatus::Scheduled => write!(f, "Scheduled"),
            ContestStatus::Open => write!(f, "Open"),
            ContestStatus::Closed => write!(f, "Closed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contest {
    pub id: u64,
    pub office: String,
    pub candidate_ids: Vec<u64>,
    /// voter id -> candidate id. One ballot per voter; revoting replaces.
    pub ballots: BTreeMap<u64, u64>,
    pub opens_at: DateTime<Utc>,
    pub closes_at: DateTime<Utc>,
    pub status: ContestStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContestResult {
    pub contest_id: u64,
    pub office: String,
    /// candidate id -> vote count, including zero-vote candidates.
    pub totals: BTreeMap<u64, usize>,
    pub winner: Option<u64>,
    /// Non-empty exactly when `winner` is None and any votes were cast.
    pub tied: Vec<u64>,
}

/// Plurality tally over a ballot map. Pure and separately testable.
pub fn tally_contest(contest: &Contest) -> ContestResult {
    let mut totals: BTreeMap<u64, usize> =
        contest.candidate_ids.iter().map(|&c| (c, 0)).collect();
    for candidate in contest.ballots.values() {
        if let Some(count) = totals.get_mut(candidate) {
            *count += 1;
        }
    }

    let top = totals.values().copied().max().unwrap_or(0);
    let leaders: Vec<u64> = if top == 0 {
        Vec::new()
    } else {
        totals
            .iter()
            .filter(|(_, &count)| count == top)
            .map(|(&c, _)| c)
            .collect()
    };

    let (winner, tied) = match leaders.as_slice() {
        [single] => (Some(*single), Vec::new()),
        [] => (None, Vec::new()),
        _ => (None, leaders),
    };

    ContestResult {
        contest_id: contest.id,
        office: contest.office.clone(),
        totals,
        winner,
        tied,
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ElectionError {
    #[error("No contest with id {0}")]
    UnknownContest(u64),

    #[error("Contest needs at least two candidates")]
    NotEnoughCandidates,

    #[error("Close time must be after open time")]
    BadSchedule,

    #[error("Contest is {0}; polls are not open")]
    PollsNotOpen(ContestStatus),

    #[error("Contest is {0}; cannot {1}")]
    WrongStatus(ContestStatus, &'static str),

    #[error("User {0} is not a candidate in this contest")]
    NotACandidate(u64),

    #[error(transparent)]
    Citizenship(#[from] CitizenshipError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct ElectionService<S: RegistryStore> {
    registry: Arc<RegistryService<S>>,
}

impl<S: RegistryStore> ElectionService<S> {
    pub fn new(registry: Arc<RegistryService<S>>) -> Self {
        Self { registry }
    }

    /// Schedule a contest. All candidates must be active citizens.
    pub async fn schedule(
        &self,
        office: String,
        candidate_ids: Vec<u64>,
        opens_at: DateTime<Utc>,
        closes_at: DateTime<Utc>,
    ) -> Result<Contest, ElectionError> {
        if candidate_ids.len() < 2 {
            return Err(ElectionError::NotEnoughCandidates);
        }
        if closes_at <= opens_at {
            return Err(ElectionError::BadSchedule);
        }

        self.registry
            .mutate(|reg| {
                for &candidate in &candidate_ids {
                    citizenship::require_active(reg, candidate)?;
                }
                let id = reg.next_contest_id();
                let contest = Contest {
                    id,
                    office,
                    candidate_ids,
                    ballots: BTreeMap::new(),
                    opens_at,
                    closes_at,
                    status: ContestStatus::Scheduled,
                };
                reg.contests.insert(id, contest.clone());
                Ok(contest)
            })
            .await
    }

    pub async fn open_polls(&self, contest_id: u64) -> Result<Contest, ElectionError> {
        self.registry
            .mutate(|reg| {
                let contest = reg
                    .contests
                    .get_mut(&contest_id)
                    .ok_or(ElectionError::UnknownContest(contest_id))?;
                if contest.status != ContestStatus::Scheduled {
                    return Err(ElectionError::WrongStatus(contest.status, "open polls"));
                }
                contest.status = ContestStatus::Open;
                Ok(contest.clone())
            })
            .await
    }

    /// Cast a vote. One ballot per voter; voting again replaces it.
    pub async fn cast_vote(
        &self,
        contest_id: u64,
        voter_id: u64,
        candidate_id: u64,
    ) -> Result<(), ElectionError> {
        self.registry
            .mutate(|reg| {
                citizenship::require_active(reg, voter_id)?;
                let contest = reg
                    .contests
                    .get_mut(&contest_id)
                    .ok_or(ElectionError::UnknownContest(contest_id))?;
                if contest.status != ContestStatus::Open {
                    return Err(ElectionError::PollsNotOpen(contest.status));
                }
                if !contest.candidate_ids.contains(&candidate_id) {
                    return Err(ElectionError::NotACandidate(candidate_id));
                }
                contest.ballots.insert(voter_id, candidate_id);
                Ok(())
            })
            .await
    }

    pub async fn close_polls(&self, contest_id: u64) -> Result<ContestResult, ElectionError> {
        self.registry
            .mutate(|reg| {
                let contest = reg
                    .contests
                    .get_mut(&contest_id)
                    .ok_or(ElectionError::UnknownContest(contest_id))?;
                if contest.status != ContestStatus::Open {
                    return Err(ElectionError::WrongStatus(contest.status, "close polls"));
                }
                contest.status = ContestStatus::Closed;
                Ok(tally_contest(contest))
            })
            .await
    }

    /// Close every open contest whose scheduled close time has passed.
    /// Driven by the background sweep in main.
    pub async fn close_due(&self, now: DateTime<Utc>) -> Result<Vec<ContestResult>, ElectionError> {
        // An idle sweep must not write: a save rotates the registry backups,
        // and a few no-op sweeps would overwrite every good generation.
        let any_due = self
            .registry
            .read(|reg| {
                reg.contests
                    .values()
                    .any(|c| c.status == ContestStatus::Open && c.closes_at <= now)
            })
            .await;
        if !any_due {
            return Ok(Vec::new());
        }

        self.registry
            .mutate(|reg| {
                let mut results = Vec::new();
                for contest in reg.contests.values_mut() {
                    if contest.status == ContestStatus::Open && contest.closes_at <= now {
                        contest.status = ContestStatus::Closed;
                        results.push(tally_contest(contest));
                    }
                }
                Ok::<_, ElectionError>(results)
            })
            .await
    }

    pub async fn contest(&self, contest_id: u64) -> Result<Contest, ElectionError> {
        self.registry
            .read(|reg| reg.contests.get(&contest_id).cloned())
            .await
            .ok_or(ElectionError::UnknownContest(contest_id))
    }

    /// Result of a closed contest (re-tallied from the stored ballots).
    pub async fn results(&self, contest_id: u64) -> Result<ContestResult, ElectionError> {
        let contest = self.contest(contest_id).await?;
        if contest.status != ContestStatus::Closed {
            return Err(ElectionError::WrongStatus(contest.status, "read results"));
        }
        Ok(tally_contest(&contest))
    }
}

// ============================================================================
// TESTS
// ============================================================================
