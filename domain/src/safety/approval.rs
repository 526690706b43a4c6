//! Approval status state machine.

use serde::{Deserialize, Serialize};

/// Where a pending action stands in the approval lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
    AutoApproved,
    Expired,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
            ApprovalStatus::AutoApproved => "auto_approved",
            ApprovalStatus::Expired => "expired",
        }
    }

    /// No status change can follow.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ApprovalStatus::Rejected | ApprovalStatus::Expired)
    }

    /// May be handed to the executor.
    pub fn is_executable(&self) -> bool {
        matches!(self, ApprovalStatus::Approved | ApprovalStatus::AutoApproved)
    }

    /// Valid status-to-status edges. Execution is tracked separately.
    pub fn can_transition_to(&self, next: ApprovalStatus) -> bool {
        matches!(
            (self, next),
            (
                ApprovalStatus::Pending,
                ApprovalStatus::Approved
                    | ApprovalStatus::Rejected
                    | ApprovalStatus::AutoApproved
                    | ApprovalStatus::Expired
            )
        )
    }
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ApprovalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ApprovalStatus::Pending),
            "approved" => Ok(ApprovalStatus::Approved),
            "rejected" => Ok(ApprovalStatus::Rejected),
            "auto_approved" => Ok(ApprovalStatus::AutoApproved),
            "expired" => Ok(ApprovalStatus::Expired),
            _ => Err(format!("Unknown approval status: {}", s)),
        }
    }
}

/// A reviewer's decision on a pending action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl From<ReviewDecision> for ApprovalStatus {
    fn from(decision: ReviewDecision) -> Self {
        match decision {
            ReviewDecision::Approved => ApprovalStatus::Approved,
            ReviewDecision::Rejected => ApprovalStatus::Rejected,
        }
    }
}

impl std::str::FromStr for ReviewDecision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "approve" | "approved" => Ok(ReviewDecision::Approved),
            "reject" | "rejected" => Ok(ReviewDecision::Rejected),
            _ => Err(format!("Unknown decision: {}. Valid: approved, rejected", s)),
        }
    }
}

/// Whether a sequence of observed statuses is a walk of the state machine.
///
/// Repeated observations of the same status are allowed.
pub fn is_valid_status_path(path: &[ApprovalStatus]) -> bool {
    path.windows(2)
        .all(|w| w[0] == w[1] || w[0].can_transition_to(w[1]))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ApprovalStatus; 5] = [
        ApprovalStatus::Pending,
        ApprovalStatus::Approved,
        ApprovalStatus::Rejected,
        ApprovalStatus::AutoApproved,
        ApprovalStatus::Expired,
    ];

    #[test]
    fn test_only_pending_has_outgoing_edges() {
        for from in ALL {
            for to in ALL {
                let expected = from == ApprovalStatus::Pending && to != ApprovalStatus::Pending;
                assert_eq!(from.can_transition_to(to), expected, "{} -> {}", from, to);
            }
        }
    }

    #[test]
    fn test_terminal_and_executable() {
        assert!(ApprovalStatus::Rejected.is_terminal());
        assert!(ApprovalStatus::Expired.is_terminal());
        assert!(!ApprovalStatus::Approved.is_terminal());
        assert!(ApprovalStatus::Approved.is_executable());
        assert!(ApprovalStatus::AutoApproved.is_executable());
        assert!(!ApprovalStatus::Pending.is_executable());
    }

    #[test]
    fn test_status_path_validation() {
        use ApprovalStatus::*;
        assert!(is_valid_status_path(&[Pending, Approved]));
        assert!(is_valid_status_path(&[Pending, Pending, Expired]));
        assert!(is_valid_status_path(&[AutoApproved]));
        assert!(!is_valid_status_path(&[Pending, Rejected, Approved]));
        assert!(!is_valid_status_path(&[Expired, Pending]));
    }

    #[test]
    fn test_decision_parse_and_convert() {
        let d: ReviewDecision = "approve".parse().unwrap();
        assert_eq!(ApprovalStatus::from(d), ApprovalStatus::Approved);
        assert!("maybe".parse::<ReviewDecision>().is_err());
        assert_eq!(
            "auto_approved".parse::<ApprovalStatus>().unwrap(),
            ApprovalStatus::AutoApproved
        );
    }
}
