//! Test-only helpers for constructing region trees.

use crate::core::region::{Distribution, Region, RegionType};

fn region(id: &str, kind: RegionType) -> Region {
    Region {
        id: id.to_string(),
        kind,
        label: None,
        duration: 0.0,
        impacts: None,
        children: None,
        distribution: None,
        bound: None,
    }
}

/// Create a task with the given duration and impact vector.
pub fn task(id: &str, duration: f64, impacts: &[f64]) -> Region {
    Region {
        duration,
        impacts: Some(impacts.to_vec()),
        ..region(id, RegionType::Task)
    }
}

/// Create a sequence running `first` then `second`.
pub fn sequential(id: &str, first: Region, second: Region) -> Region {
    Region {
        children: Some(vec![first, second]),
        ..region(id, RegionType::Sequential)
    }
}

pub fn parallel(id: &str, branches: Vec<Region>) -> Region {
    Region {
        children: Some(branches),
        ..region(id, RegionType::Parallel)
    }
}

/// Create a choice; `distribution` is optional for choices.
pub fn choice(id: &str, branches: Vec<Region>, distribution: Option<Vec<f64>>) -> Region {
    Region {
        children: Some(branches),
        distribution: distribution.map(Distribution::Branches),
        ..region(id, RegionType::Choice)
    }
}

pub fn nature(id: &str, branches: Vec<Region>, distribution: Vec<f64>) -> Region {
    Region {
        children: Some(branches),
        distribution: Some(Distribution::Branches(distribution)),
        ..region(id, RegionType::Nature)
    }
}

/// Create a loop repeating `body` with loop-back `probability`, at most `bound` times.
pub fn loop_region(id: &str, body: Region, probability: f64, bound: u32) -> Region {
    Region {
        children: Some(vec![body]),
        distribution: Some(Distribution::Single(probability)),
        bound: Some(f64::from(bound)),
        ..region(id, RegionType::Loop)
    }
}
