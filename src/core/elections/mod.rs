// Elections - contests, ballots, and seat apportionment.

mod apportionment;
mod election_service;

pub use apportionment::{apportion, ApportionmentError};
pub use election_service::{
    Contest, ContestResult, ContestStatus, ElectionError, ElectionService,
};
