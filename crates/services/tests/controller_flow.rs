mod support;

use exam_core::model::{QuestionNumber, SessionState, TestId};
use services::{CommandOutcome, ControllerError, Notice, SessionCommand, SubmissionError};

use support::{Harness, StubTransport, jane, paper, short_paper};

fn answer(number: u32, token: &str) -> SessionCommand {
    SessionCommand::SelectAnswer {
        number: QuestionNumber::new(number),
        token: token.into(),
    }
}

async fn sign_in(controller: &mut services::SessionController) {
    let identity = jane();
    controller
        .dispatch(SessionCommand::UpdateProfile {
            name: identity.name,
            class: identity.class,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn answers_survive_a_reload_through_the_draft() {
    let harness = Harness::new(StubTransport::succeeding());
    let mut controller = harness.controller();
    controller.select_test(paper()).await.unwrap();
    controller.dispatch(SessionCommand::Start).await.unwrap();
    controller.dispatch(answer(1, "A")).await.unwrap();
    controller.dispatch(answer(2, "C")).await.unwrap();
    controller
        .dispatch(SessionCommand::ToggleFlag(QuestionNumber::new(2)))
        .await
        .unwrap();

    let mut reloaded = harness.controller();
    let report = reloaded.select_test(paper()).await.unwrap();

    assert_eq!(report.restored_answers, 2);
    assert_eq!(report.restored_flags, 1);
    let session = reloaded.session().unwrap();
    assert_eq!(session.answer(QuestionNumber::new(2)), Some("C"));
    assert!(session.is_flagged(QuestionNumber::new(2)));
    assert_eq!(session.state(), SessionState::NotStarted);
}

#[tokio::test]
async fn offline_submit_queues_without_network() {
    let harness = Harness::new(StubTransport::succeeding());
    let mut controller = harness.controller().with_online(false);
    sign_in(&mut controller).await;
    controller.select_test(paper()).await.unwrap();
    controller.dispatch(SessionCommand::Start).await.unwrap();
    controller.dispatch(answer(1, "A")).await.unwrap();

    let outcome = controller.dispatch(SessionCommand::Submit).await.unwrap();

    assert!(matches!(outcome, CommandOutcome::Queued));
    assert_eq!(harness.transport.call_count(), 0);
    assert_eq!(harness.services.persistence().list_pending().await.unwrap().len(), 1);
    assert!(harness
        .notifier
        .contains(|n| matches!(n, Notice::SubmissionQueued { .. })));
}

#[tokio::test]
async fn going_online_replays_the_queue() {
    let harness = Harness::new(StubTransport::succeeding());
    let mut controller = harness.controller().with_online(false);
    sign_in(&mut controller).await;
    controller.select_test(paper()).await.unwrap();
    controller.dispatch(answer(3, "B")).await.unwrap();
    controller.dispatch(SessionCommand::Submit).await.unwrap();

    let outcome = controller
        .dispatch(SessionCommand::ConnectivityChanged { online: true })
        .await
        .unwrap();

    let CommandOutcome::Resynced(report) = outcome else {
        panic!("expected a resync, got {outcome:?}");
    };
    assert_eq!(report.delivered, 1);
    assert!(report.is_drained());
    assert!(controller.is_online());
    assert!(harness
        .services
        .persistence()
        .completed_tests()
        .await
        .contains(&TestId::from(1)));

    let again = controller
        .dispatch(SessionCommand::ConnectivityChanged { online: true })
        .await
        .unwrap();
    assert!(matches!(again, CommandOutcome::Unchanged));
}

#[tokio::test]
async fn submit_without_identity_is_blocked() {
    let harness = Harness::new(StubTransport::succeeding());
    let mut controller = harness.controller();
    controller.select_test(paper()).await.unwrap();

    let err = controller.dispatch(SessionCommand::Submit).await.unwrap_err();

    assert!(matches!(
        err,
        ControllerError::Submission(SubmissionError::Validation(_))
    ));
    assert_eq!(harness.transport.call_count(), 0);
}

#[tokio::test]
async fn time_up_auto_submits_when_identity_is_known() {
    let harness = Harness::new(StubTransport::succeeding());
    let mut controller = harness.controller();
    sign_in(&mut controller).await;
    controller.select_test(short_paper(3)).await.unwrap();
    controller.dispatch(SessionCommand::Start).await.unwrap();
    controller.dispatch(answer(1, "A")).await.unwrap();

    assert!(matches!(
        controller.tick().await.unwrap(),
        CommandOutcome::Ticked { remaining_secs: 2 }
    ));
    controller.tick().await.unwrap();
    let outcome = controller.tick().await.unwrap();

    assert!(matches!(outcome, CommandOutcome::Submitted(_)));
    assert_eq!(harness.transport.call_count(), 1);
    assert_eq!(harness.transport.calls()[0].time_spent_secs, 3);
    assert!(harness
        .notifier
        .contains(|n| *n == Notice::TimeUp { auto_submit: true }));
    assert_eq!(controller.session().unwrap().state(), SessionState::NotStarted);
}

#[tokio::test]
async fn time_up_without_identity_prompts_for_it() {
    let harness = Harness::new(StubTransport::succeeding());
    let mut controller = harness.controller();
    controller.select_test(short_paper(1)).await.unwrap();
    controller.dispatch(SessionCommand::Start).await.unwrap();
    controller.dispatch(answer(2, "D")).await.unwrap();

    let outcome = controller.tick().await.unwrap();

    assert!(matches!(outcome, CommandOutcome::TimedOut));
    assert!(harness.notifier.contains(|n| *n == Notice::IdentityRequired));
    assert_eq!(harness.transport.call_count(), 0);
    let session = controller.session().unwrap();
    assert_eq!(session.state(), SessionState::TimedOut);
    assert!(matches!(
        controller.dispatch(answer(3, "A")).await,
        Err(ControllerError::Session(_))
    ));

    sign_in(&mut controller).await;
    let submitted = controller.dispatch(SessionCommand::Submit).await.unwrap();
    assert!(matches!(submitted, CommandOutcome::Submitted(_)));
}

#[tokio::test]
async fn switching_tests_mid_attempt_is_refused() {
    let harness = Harness::new(StubTransport::succeeding());
    let mut controller = harness.controller();
    controller.select_test(paper()).await.unwrap();
    controller.dispatch(SessionCommand::Start).await.unwrap();

    let err = controller.select_test(short_paper(60)).await.unwrap_err();
    assert!(matches!(err, ControllerError::TestInProgress(_)));

    controller.dispatch(SessionCommand::Pause).await.unwrap();
    controller.select_test(short_paper(60)).await.unwrap();
    assert_eq!(controller.session().unwrap().test_id(), &TestId::from(7));
}

#[tokio::test]
async fn reselecting_the_running_test_keeps_its_clock() {
    let harness = Harness::new(StubTransport::succeeding());
    let mut controller = harness.controller();
    controller.select_test(paper()).await.unwrap();
    controller.dispatch(SessionCommand::Start).await.unwrap();
    for _ in 0..100 {
        controller.tick().await.unwrap();
    }
    controller.dispatch(answer(1, "A")).await.unwrap();

    let err = controller.select_test(paper()).await.unwrap_err();
    assert!(matches!(err, ControllerError::TestInProgress(_)));

    let session = controller.session().unwrap();
    assert_eq!(session.state(), SessionState::Active);
    assert_eq!(session.time_remaining_secs(), 3500);
    assert_eq!(session.answers().len(), 1);
}

#[tokio::test]
async fn reset_clears_answers_and_draft() {
    let harness = Harness::new(StubTransport::succeeding());
    let mut controller = harness.controller();
    controller.select_test(paper()).await.unwrap();
    controller.dispatch(answer(1, "A")).await.unwrap();

    controller.dispatch(SessionCommand::Reset).await.unwrap();

    assert!(controller.session().unwrap().answers().is_empty());
    assert!(harness
        .services
        .persistence()
        .load_draft(&TestId::from(1))
        .await
        .is_empty());
}

#[tokio::test]
async fn commands_without_a_test_are_rejected() {
    let harness = Harness::new(StubTransport::succeeding());
    let mut controller = harness.controller();

    let err = controller.dispatch(SessionCommand::Start).await.unwrap_err();
    assert!(matches!(err, ControllerError::NoActiveTest));
    assert!(matches!(
        controller.tick().await.unwrap(),
        CommandOutcome::Unchanged
    ));
}

#[tokio::test]
async fn startup_loads_profile_and_drains_queue() {
    let harness = Harness::new(StubTransport::failing());
    {
        let mut controller = harness.controller();
        sign_in(&mut controller).await;
        controller.select_test(paper()).await.unwrap();
        controller.dispatch(answer(1, "A")).await.unwrap();
        controller.dispatch(SessionCommand::Submit).await.unwrap();
    }
    harness.transport.set_fail_all(false);

    let mut controller = harness.controller();
    let report = controller.startup().await.unwrap().unwrap();

    assert_eq!(controller.profile().name, "Jane Doe");
    assert_eq!(report.delivered, 1);
    assert!(harness.services.persistence().list_pending().await.unwrap().is_empty());
}
