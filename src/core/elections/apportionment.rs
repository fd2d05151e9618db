// Huntington-Hill apportionment, the method the US House has used since 1941.
//
// Every region starts with one seat. Each remaining seat goes to the region
// with the highest priority value pop / sqrt(n * (n + 1)), where n is the
// number of seats it already holds.

use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApportionmentError {
    #[error("Cannot apportion seats across zero regions")]
    NoRegions,

    #[error("Need at least {needed} seats to give every region one (got {seats})")]
    TooFewSeats { needed: usize, seats: usize },
}

/// Apportion `seats` across regions by population.
///
/// Regions with zero population still receive their guaranteed seat but never
/// win a priority comparison. Priority ties break by region name, which keeps
/// the result deterministic.
pub fn apportion(
    populations: &BTreeMap<String, u64>,
    seats: usize,
) -> Result<BTreeMap<String, usize>, ApportionmentError> {
    if populations.is_empty() {
        return Err(ApportionmentError::NoRegions);
    }
    if seats < populations.len() {
        return Err(ApportionmentError::TooFewSeats {
            needed: populations.len(),
            seats,
        });
    }

    let mut allocation: BTreeMap<String, usize> =
        populations.keys().map(|r| (r.clone(), 1)).collect();

    for _ in populations.len()..seats {
        // BTreeMap iteration order plus strict `>` makes ties go to the
        // alphabetically first region.
        let mut best: Option<(&String, f64)> = None;
        for (region, &pop) in populations {
            let n = allocation[region] as f64;
            let priority = pop as f64 / (n * (n + 1.0)).sqrt();
            match best {
                Some((_, best_priority)) if priority <= best_priority => {}
                _ => best = Some((region, priority)),
            }
        }
        if let Some((region, _)) = best {
            if let Some(held) = allocation.get_mut(region) {
                *held += 1;
            }
        }
    }

    Ok(allocation)
}
