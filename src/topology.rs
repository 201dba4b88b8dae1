//! Node topology.
//!
//! Index-mutating operations only run on nodes whose [`Topology`] allows it;
//! queries run everywhere.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Decides whether this node may mutate indexes.
pub trait Topology: Send + Sync {
    fn can_mutate_indexes(&self) -> bool;
}

impl<F> Topology for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn can_mutate_indexes(&self) -> bool {
        self()
    }
}

/// Role of this node in a load-balanced deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerRole {
    /// A single node doing everything.
    #[default]
    Single,
    /// The node that publishes changes to subscribers.
    Publisher,
    /// A replica that only serves queries.
    Subscriber,
    Unknown,
}

impl Topology for ServerRole {
    fn can_mutate_indexes(&self) -> bool {
        !matches!(self, ServerRole::Subscriber)
    }
}

impl FromStr for ServerRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "single" => Ok(ServerRole::Single),
            "publisher" => Ok(ServerRole::Publisher),
            "subscriber" => Ok(ServerRole::Subscriber),
            "unknown" => Ok(ServerRole::Unknown),
            other => Err(format!("unknown server role: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_server_roles() {
        assert!(ServerRole::Single.can_mutate_indexes());
        assert!(ServerRole::Publisher.can_mutate_indexes());
        assert!(ServerRole::Unknown.can_mutate_indexes());
        assert!(!ServerRole::Subscriber.can_mutate_indexes());
    }

    #[test]
    fn test_closure_topology() {
        let leader = Arc::new(AtomicBool::new(false));
        let flag = leader.clone();
        let topology = move || flag.load(Ordering::SeqCst);

        assert!(!topology.can_mutate_indexes());
        leader.store(true, Ordering::SeqCst);
        assert!(topology.can_mutate_indexes());
    }

    #[test]
    fn test_parse_role() {
        assert_eq!("Subscriber".parse::<ServerRole>().unwrap(), ServerRole::Subscriber);
        assert!("replica".parse::<ServerRole>().is_err());
    }
}
