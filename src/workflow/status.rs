//! Role-gated status transitions of a request.
//!
//! The chain is fixed: secretary, siva, raghu, manoj, then IT records the SAP
//! update and the request is closed by marking it completed.

use crate::db::models::approval::Decision;
use crate::db::models::requests::RequestStatus;
use crate::db::models::user::Role;
use crate::workflow::error::{WorkflowError, WorkflowResult};

/// Non-decision transitions, performed outside the approver chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    SapUpdate,
    MarkCompleted,
}

impl RequestStatus {
    /// Every status a request can be stored with.
    pub const ALL: [RequestStatus; 9] = [
        RequestStatus::Draft,
        RequestStatus::PendingSecretary,
        RequestStatus::PendingSiva,
        RequestStatus::PendingRaghu,
        RequestStatus::PendingManoj,
        RequestStatus::Approved,
        RequestStatus::Rejected,
        RequestStatus::SapUpdated,
        RequestStatus::Completed,
    ];

    /// Status every submission and resubmission enters the chain at.
    pub const INITIAL: RequestStatus = RequestStatus::PendingSecretary;

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Draft => "draft",
            RequestStatus::PendingSecretary => "pending-secretary",
            RequestStatus::PendingSiva => "pending-siva",
            RequestStatus::PendingRaghu => "pending-raghu",
            RequestStatus::PendingManoj => "pending-manoj",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
            RequestStatus::SapUpdated => "sap-updated",
            RequestStatus::Completed => "completed",
        }
    }

    /// Role allowed to approve or reject in this status, if any.
    pub fn approver_role(&self) -> Option<Role> {
        match self {
            RequestStatus::PendingSecretary => Some(Role::Secretary),
            RequestStatus::PendingSiva => Some(Role::Siva),
            RequestStatus::PendingRaghu => Some(Role::Raghu),
            RequestStatus::PendingManoj => Some(Role::Manoj),
            _ => None,
        }
    }

    /// Role whose members are told a request has reached this status.
    pub fn responsible_role(&self) -> Option<Role> {
        match self {
            RequestStatus::Approved => Some(Role::It),
            RequestStatus::SapUpdated => Some(Role::Admin),
            other => other.approver_role(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Rejected | RequestStatus::Completed)
    }

    /// Whether a new details version may be submitted. Resubmission restarts
    /// the chain; once approved, data changes go through a change request.
    pub fn accepts_resubmission(&self) -> bool {
        matches!(
            self,
            RequestStatus::Draft
                | RequestStatus::PendingSecretary
                | RequestStatus::PendingSiva
                | RequestStatus::PendingRaghu
                | RequestStatus::PendingManoj
                | RequestStatus::Rejected
        )
    }

    /// Whether a change request may carry this request's data forward.
    pub fn accepts_change_request(&self) -> bool {
        matches!(
            self,
            RequestStatus::Approved | RequestStatus::SapUpdated | RequestStatus::Completed
        )
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pure transition function for approver decisions. Unconditional once a
/// pending status is given; role checks happen in [`authorize_decision`].
pub fn next_status(current: RequestStatus, decision: Decision) -> Option<RequestStatus> {
    let approved = match current {
        RequestStatus::PendingSecretary => RequestStatus::PendingSiva,
        RequestStatus::PendingSiva => RequestStatus::PendingRaghu,
        RequestStatus::PendingRaghu => RequestStatus::PendingManoj,
        RequestStatus::PendingManoj => RequestStatus::Approved,
        _ => return None,
    };
    Some(match decision {
        Decision::Approve => approved,
        Decision::Reject => RequestStatus::Rejected,
    })
}

/// Checks the acting role against the status and returns the next status.
pub fn authorize_decision(
    current: RequestStatus,
    role: Role,
    decision: Decision,
) -> WorkflowResult<RequestStatus> {
    match current.approver_role() {
        Some(required) if required == role => next_status(current, decision).ok_or_else(|| {
            WorkflowError::Authorization(format!("request in status {current} takes no decisions"))
        }),
        Some(required) => Err(WorkflowError::Authorization(format!(
            "request in status {current} awaits {required}, not {role}"
        ))),
        None if current.is_terminal() => Err(WorkflowError::Authorization(format!(
            "request is {current}; its approval chain is closed"
        ))),
        None => Err(WorkflowError::Authorization(format!(
            "request in status {current} is not awaiting an approval decision"
        ))),
    }
}

/// Checks an administrative action and returns the next status.
pub fn authorize_admin_action(
    current: RequestStatus,
    role: Role,
    action: AdminAction,
) -> WorkflowResult<RequestStatus> {
    match (action, current) {
        (AdminAction::SapUpdate, RequestStatus::Approved) if role == Role::It => {
            Ok(RequestStatus::SapUpdated)
        }
        (AdminAction::SapUpdate, RequestStatus::Approved) => Err(WorkflowError::Authorization(
            format!("only it may record the SAP update, not {role}"),
        )),
        (AdminAction::SapUpdate, _) => Err(WorkflowError::Authorization(format!(
            "request in status {current} is not ready for the SAP update"
        ))),
        (AdminAction::MarkCompleted, RequestStatus::SapUpdated) => Ok(RequestStatus::Completed),
        (AdminAction::MarkCompleted, _) => Err(WorkflowError::Authorization(format!(
            "request in status {current} cannot be marked completed"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROLES: [Role; 7] = [
        Role::Requestor,
        Role::Secretary,
        Role::Siva,
        Role::Raghu,
        Role::Manoj,
        Role::It,
        Role::Admin,
    ];

    // (status, role, decision) -> next, exactly the approver table
    fn table() -> Vec<(RequestStatus, Role, Decision, RequestStatus)> {
        use Decision::*;
        use RequestStatus::*;
        vec![
            (PendingSecretary, Role::Secretary, Approve, PendingSiva),
            (PendingSecretary, Role::Secretary, Reject, Rejected),
            (PendingSiva, Role::Siva, Approve, PendingRaghu),
            (PendingSiva, Role::Siva, Reject, Rejected),
            (PendingRaghu, Role::Raghu, Approve, PendingManoj),
            (PendingRaghu, Role::Raghu, Reject, Rejected),
            (PendingManoj, Role::Manoj, Approve, Approved),
            (PendingManoj, Role::Manoj, Reject, Rejected),
        ]
    }

    #[test]
    fn table_entries_are_legal() {
        for (status, role, decision, expected) in table() {
            assert_eq!(authorize_decision(status, role, decision).unwrap(), expected);
        }
    }

    #[test]
    fn everything_outside_the_table_is_unauthorized() {
        let legal = table();
        for status in RequestStatus::ALL {
            for role in ROLES {
                for decision in [Decision::Approve, Decision::Reject] {
                    if legal
                        .iter()
                        .any(|(s, r, d, _)| *s == status && *r == role && *d == decision)
                    {
                        continue;
                    }
                    assert!(
                        matches!(
                            authorize_decision(status, role, decision),
                            Err(WorkflowError::Authorization(_))
                        ),
                        "{status} / {role} / {decision:?} should be refused"
                    );
                }
            }
        }
    }

    #[test]
    fn terminal_states_take_no_decisions() {
        for status in [RequestStatus::Rejected, RequestStatus::Completed] {
            assert!(status.is_terminal());
            assert_eq!(status.approver_role(), None);
            assert_eq!(next_status(status, Decision::Approve), None);
            let err = authorize_decision(status, Role::Secretary, Decision::Approve).unwrap_err();
            assert!(
                matches!(err, WorkflowError::Authorization(ref m) if m.contains("closed")),
                "{err:?}"
            );
        }
    }

    #[test]
    fn sap_update_requires_it_on_approved() {
        assert_eq!(
            authorize_admin_action(RequestStatus::Approved, Role::It, AdminAction::SapUpdate)
                .unwrap(),
            RequestStatus::SapUpdated
        );
        assert!(
            authorize_admin_action(RequestStatus::Approved, Role::Manoj, AdminAction::SapUpdate)
                .is_err()
        );
        assert!(authorize_admin_action(
            RequestStatus::PendingManoj,
            Role::It,
            AdminAction::SapUpdate
        )
        .is_err());
    }

    #[test]
    fn completion_only_from_sap_updated() {
        for role in ROLES {
            assert_eq!(
                authorize_admin_action(RequestStatus::SapUpdated, role, AdminAction::MarkCompleted)
                    .unwrap(),
                RequestStatus::Completed
            );
        }
        assert!(authorize_admin_action(
            RequestStatus::Approved,
            Role::Admin,
            AdminAction::MarkCompleted
        )
        .is_err());
    }

    #[test]
    fn resubmission_rules() {
        assert!(RequestStatus::Rejected.accepts_resubmission());
        assert!(RequestStatus::PendingRaghu.accepts_resubmission());
        assert!(!RequestStatus::Approved.accepts_resubmission());
        assert!(!RequestStatus::Completed.accepts_resubmission());
        assert!(RequestStatus::Completed.accepts_change_request());
        assert!(!RequestStatus::Rejected.accepts_change_request());
    }

    #[test]
    fn status_strings_match_wire_format() {
        for status in RequestStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }
}
