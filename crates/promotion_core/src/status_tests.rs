use super::*;

const GUARDED_EVENTS: [PromotionEvent; 5] = [
    PromotionEvent::Approve,
    PromotionEvent::Reject,
    PromotionEvent::Start,
    PromotionEvent::Complete,
    PromotionEvent::RollBack,
];

#[test]
fn test_happy_path_transitions() {
    use PromotionEvent as E;
    use PromotionStatus as S;

    assert_eq!(transition(S::PendingApproval, E::Approve), Ok(S::Approved));
    assert_eq!(transition(S::PendingApproval, E::Reject), Ok(S::Rejected));
    assert_eq!(transition(S::Approved, E::Start), Ok(S::InProgress));
    assert_eq!(transition(S::InProgress, E::Complete), Ok(S::Completed));
    assert_eq!(transition(S::InProgress, E::Fail), Ok(S::Failed));
    assert_eq!(transition(S::Completed, E::RollBack), Ok(S::RolledBack));
}

#[test]
fn test_only_listed_guarded_transitions_succeed() {
    let allowed = [
        (PromotionStatus::PendingApproval, PromotionEvent::Approve),
        (PromotionStatus::PendingApproval, PromotionEvent::Reject),
        (PromotionStatus::Approved, PromotionEvent::Start),
        (PromotionStatus::InProgress, PromotionEvent::Complete),
        (PromotionStatus::Completed, PromotionEvent::RollBack),
    ];

    for state in PromotionStatus::ALL {
        for event in GUARDED_EVENTS {
            let result = transition(state, event);
            if allowed.contains(&(state, event)) {
                assert!(result.is_ok(), "{state} + {event} should be accepted");
            } else {
                assert_eq!(
                    result,
                    Err(InvalidTransition { from: state, event }),
                    "{state} + {event} should be rejected"
                );
            }
        }
    }
}

#[test]
fn test_fail_is_unguarded() {
    for state in PromotionStatus::ALL {
        assert_eq!(
            transition(state, PromotionEvent::Fail),
            Ok(PromotionStatus::Failed)
        );
    }
}

#[test]
fn test_approve_rejected_request_is_invalid() {
    let err = transition(PromotionStatus::Rejected, PromotionEvent::Approve).unwrap_err();
    assert_eq!(err.from, PromotionStatus::Rejected);
    assert_eq!(
        err.to_string(),
        "Cannot approve a promotion request in status REJECTED"
    );
}

#[test]
fn test_terminal_states() {
    assert!(PromotionStatus::Rejected.is_terminal());
    assert!(PromotionStatus::Failed.is_terminal());
    assert!(PromotionStatus::RolledBack.is_terminal());
    assert!(!PromotionStatus::Completed.is_terminal());
    assert!(!PromotionStatus::PendingApproval.is_terminal());
}

#[test]
fn test_status_parse_and_display() {
    for status in PromotionStatus::ALL {
        assert_eq!(status.as_str().parse::<PromotionStatus>(), Ok(status));
    }
    assert_eq!(
        "pending_approval".parse::<PromotionStatus>(),
        Ok(PromotionStatus::PendingApproval)
    );
    assert!("DONE".parse::<PromotionStatus>().is_err());
}

#[test]
fn test_status_serializes_screaming_snake_case() {
    let json = serde_json::to_string(&PromotionStatus::RolledBack).unwrap();
    assert_eq!(json, "\"ROLLED_BACK\"");
}
