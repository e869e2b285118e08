use super::*;

#[test]
fn word_count_ignores_markup_and_whitespace() {
    assert_eq!(word_count(""), 0);
    assert_eq!(word_count("# Title\n\n*bold* _it_"), 11);
    assert_eq!(word_count("a - b > c | [d](e)"), 5);
    assert_eq!(word_count("故事 开始"), 4);
}

#[test]
fn normalize_title_trims_and_rejects_bad_input() {
    assert_eq!(normalize_title(None), Ok(None));
    assert_eq!(normalize_title(Some("   ")), Ok(None));
    assert_eq!(
        normalize_title(Some("  The Gate ")),
        Ok(Some("The Gate".to_string()))
    );
    assert_eq!(
        normalize_title(Some(&"x".repeat(MAX_TITLE_CHARS + 1))),
        Err(TitleError::TooLong)
    );
    assert_eq!(
        normalize_title(Some("bad\u{0007}title")),
        Err(TitleError::ContainsControl)
    );
}

#[test]
fn pull_request_transitions_follow_table() {
    use PullRequestStatus::*;

    assert_eq!(Open.transition(Merged), Ok(Merged));
    assert_eq!(Open.transition(Closed), Ok(Closed));
    assert!(Open.transition(Open).is_err());
    for terminal in [Merged, Closed] {
        assert!(terminal.is_terminal());
        for next in [Open, Merged, Closed] {
            assert_eq!(
                terminal.transition(next),
                Err(StatusTransitionError {
                    from: terminal,
                    to: next
                })
            );
        }
    }
}

#[test]
fn pull_request_status_round_trips_through_text() {
    for status in [
        PullRequestStatus::Open,
        PullRequestStatus::Merged,
        PullRequestStatus::Closed,
    ] {
        assert_eq!(PullRequestStatus::parse(status.as_str()), Some(status));
    }
    assert_eq!(PullRequestStatus::parse("draft"), None);
}

#[test]
fn branch_name_defaults_when_title_missing() {
    let mut pr = StoryPullRequest {
        id: 7,
        story_seed_id: 1,
        fork_id: 3,
        from_commit_id: 9,
        title: None,
        description: None,
        status: PullRequestStatus::Open,
        reviewer_id: None,
        created_at_ms: 0,
        updated_at_ms: 0,
    };
    assert_eq!(pr.branch_name(), "fork-3/pr-7");
    pr.title = Some("Dark ending".to_string());
    assert_eq!(pr.branch_name(), "Dark ending");
    assert_eq!(merged_chapter_title(&pr.branch_name(), 2), "Dark ending #2");
}

#[test]
fn error_kind_retry_policy() {
    assert!(ErrorKind::Conflict.is_retryable());
    assert!(ErrorKind::Transient.is_retryable());
    for kind in [
        ErrorKind::NotFound,
        ErrorKind::Forbidden,
        ErrorKind::InvalidState,
        ErrorKind::InvalidInput,
    ] {
        assert!(!kind.is_retryable(), "{kind} must not be retryable");
    }
}

#[test]
fn request_context_carries_actor_and_request_id() {
    let ctx = RequestContext::new(42).with_request_id("req-1");
    assert_eq!(ctx.actor_id(), 42);
    assert_eq!(ctx.request_id(), Some("req-1"));
    assert!(ctx.is_actor(42));
    assert!(!ctx.is_actor(7));
}
