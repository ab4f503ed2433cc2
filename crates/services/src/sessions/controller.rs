use std::sync::Arc;
use std::time::Duration;

use exam_core::model::{
    RestoreReport, Session, SessionState, StudentProfile, TestPaper, TickOutcome,
};

use crate::Clock;
use crate::error::ControllerError;
use crate::notifications::{Notice, Notifier};
use crate::persistence::LocalPersistence;
use crate::submission::{ResyncReport, SubmissionAck, SubmissionPipeline};

use super::command::{CommandOutcome, SessionCommand};
use super::progress::SessionProgress;

const AUTO_SUBMIT_GRACE: Duration = Duration::from_secs(2);

/// Owns the single live test session and routes every command through it.
///
/// Answer and flag changes are persisted as a draft before the command
/// returns. Submission goes through the pipeline, which queues failed
/// deliveries for the next resync.
pub struct SessionController {
    clock: Clock,
    persistence: LocalPersistence,
    pipeline: SubmissionPipeline,
    notifier: Arc<dyn Notifier>,
    session: Option<Session>,
    profile: StudentProfile,
    online: bool,
    auto_submit_grace: Duration,
}

impl SessionController {
    #[must_use]
    pub fn new(
        clock: Clock,
        persistence: LocalPersistence,
        pipeline: SubmissionPipeline,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            clock,
            persistence,
            pipeline,
            notifier,
            session: None,
            profile: StudentProfile::default(),
            online: true,
            auto_submit_grace: AUTO_SUBMIT_GRACE,
        }
    }

    #[must_use]
    pub fn with_auto_submit_grace(mut self, grace: Duration) -> Self {
        self.auto_submit_grace = grace;
        self
    }

    #[must_use]
    pub fn with_online(mut self, online: bool) -> Self {
        self.online = online;
        self
    }

    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn profile(&self) -> &StudentProfile {
        &self.profile
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        self.online
    }

    #[must_use]
    pub fn progress(&self) -> Option<SessionProgress> {
        self.session.as_ref().map(SessionProgress::of)
    }

    #[must_use]
    pub fn persistence(&self) -> &LocalPersistence {
        &self.persistence
    }

    /// Load the stored profile and, when online, replay pending submissions.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::Persistence` if the pending queue cannot be read.
    pub async fn startup(&mut self) -> Result<Option<ResyncReport>, ControllerError> {
        self.profile = self.persistence.load_profile().await;
        if !self.online {
            return Ok(None);
        }
        let report = self.pipeline.resync().await?;
        Ok(Some(report))
    }

    /// Make `paper` the live test, restoring its saved draft.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::TestInProgress` while the current test's timer
    /// is running, including when `paper` is that same test.
    pub async fn select_test(&mut self, paper: TestPaper) -> Result<RestoreReport, ControllerError> {
        if let Some(current) = self.session.as_ref() {
            if current.is_active() {
                return Err(ControllerError::TestInProgress(current.test_id().to_string()));
            }
        }

        let draft = self.persistence.load_draft(paper.id()).await;
        let mut session = Session::new(paper);
        let report = session.restore(&draft);
        if !report.dropped.is_empty() {
            tracing::warn!(
                test_id = %session.test_id(),
                dropped = ?report.dropped,
                "draft entries outside the test were discarded"
            );
        }
        tracing::info!(
            test_id = %session.test_id(),
            answers = report.restored_answers,
            flags = report.restored_flags,
            "test loaded"
        );
        self.session = Some(session);
        Ok(report)
    }

    /// Apply one command.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::NoActiveTest` for session commands with no test
    /// loaded, `ControllerError::Session` for invalid answers or flags, and
    /// `ControllerError::Submission` for validation failures or unsaved
    /// submissions. A queued submission is reported as `CommandOutcome::Queued`.
    pub async fn dispatch(
        &mut self,
        command: SessionCommand,
    ) -> Result<CommandOutcome, ControllerError> {
        match command {
            SessionCommand::Start => Ok(changed(self.session_mut()?.start())),
            SessionCommand::Pause => Ok(changed(self.session_mut()?.pause())),
            SessionCommand::Toggle => {
                let session = self.session_mut()?;
                let changed_state = if session.is_active() {
                    session.pause()
                } else {
                    session.start()
                };
                Ok(changed(changed_state))
            }
            SessionCommand::SelectAnswer { number, token } => {
                self.session_mut()?.select_answer(number, token)?;
                self.persist_draft().await;
                Ok(CommandOutcome::Changed)
            }
            SessionCommand::ToggleFlag(number) => {
                let flagged = self.session_mut()?.toggle_flag(number)?;
                self.persist_draft().await;
                Ok(CommandOutcome::Flagged { number, flagged })
            }
            SessionCommand::Navigate(number) => Ok(changed(self.session_mut()?.navigate(number))),
            SessionCommand::Next => Ok(changed(self.session_mut()?.next())),
            SessionCommand::Previous => Ok(changed(self.session_mut()?.previous())),
            SessionCommand::Tick => self.tick().await,
            SessionCommand::Reset => {
                self.reset().await?;
                Ok(CommandOutcome::Changed)
            }
            SessionCommand::SaveDraft => {
                self.persist_draft().await;
                let test_id = self.session_ref()?.test_id().clone();
                self.notifier.notify(Notice::DraftSaved { test_id });
                Ok(CommandOutcome::Changed)
            }
            SessionCommand::Submit => match self.submit().await {
                Ok(ack) => Ok(CommandOutcome::Submitted(ack)),
                Err(ControllerError::Submission(err)) if err.is_deferred() => {
                    Ok(CommandOutcome::Queued)
                }
                Err(err) => Err(err),
            },
            SessionCommand::ConnectivityChanged { online } => {
                match self.set_online(online).await? {
                    Some(report) => Ok(CommandOutcome::Resynced(report)),
                    None => Ok(CommandOutcome::Unchanged),
                }
            }
            SessionCommand::UpdateProfile { name, class } => {
                self.update_profile(name, class).await?;
                Ok(CommandOutcome::Changed)
            }
        }
    }

    /// Feed one second to the countdown, handling expiry.
    ///
    /// # Errors
    ///
    /// Propagates submission failures from the automatic submit after time-out.
    pub async fn tick(&mut self) -> Result<CommandOutcome, ControllerError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(CommandOutcome::Unchanged);
        };
        match session.tick() {
            TickOutcome::Ignored => Ok(CommandOutcome::Unchanged),
            TickOutcome::Counting { remaining_secs } => Ok(CommandOutcome::Ticked { remaining_secs }),
            TickOutcome::TimedOut => self.handle_time_up().await,
        }
    }

    async fn handle_time_up(&mut self) -> Result<CommandOutcome, ControllerError> {
        self.persist_draft().await;
        let auto_submit = self.profile.identity().is_complete();
        self.notifier.notify(Notice::TimeUp { auto_submit });
        if !auto_submit {
            self.notifier.notify(Notice::IdentityRequired);
            return Ok(CommandOutcome::TimedOut);
        }

        tokio::time::sleep(self.auto_submit_grace).await;
        match self.submit().await {
            Ok(ack) => Ok(CommandOutcome::Submitted(ack)),
            Err(ControllerError::Submission(err)) if err.is_deferred() => Ok(CommandOutcome::Queued),
            Err(err) => Err(err),
        }
    }

    /// Submit the live session using the stored profile's identity.
    ///
    /// While offline the record goes straight to the pending queue.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::NoActiveTest` without a loaded test and
    /// `ControllerError::Submission` for validation, queued or unsaved outcomes.
    pub async fn submit(&mut self) -> Result<SubmissionAck, ControllerError> {
        let identity = self.profile.identity();
        let session = self.session.as_mut().ok_or(ControllerError::NoActiveTest)?;
        let ack = if self.online {
            self.pipeline.submit(session, &identity).await?
        } else {
            self.pipeline.queue_offline(session, &identity).await?
        };
        Ok(ack)
    }

    /// Record a connectivity change; going online replays the pending queue.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::Persistence` if the queue cannot be read or updated.
    pub async fn set_online(
        &mut self,
        online: bool,
    ) -> Result<Option<ResyncReport>, ControllerError> {
        let was_online = std::mem::replace(&mut self.online, online);
        tracing::info!(online, "connectivity changed");
        if online && !was_online {
            let report = self.pipeline.resync().await?;
            return Ok(Some(report));
        }
        Ok(None)
    }

    /// Clear answers and flags, drop the stored draft and return to `NotStarted`.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::NoActiveTest` without a loaded test.
    pub async fn reset(&mut self) -> Result<(), ControllerError> {
        let session = self.session.as_mut().ok_or(ControllerError::NoActiveTest)?;
        session.reset();
        let test_id = session.test_id().clone();
        self.persistence.clear_draft(&test_id).await;
        Ok(())
    }

    /// Replace the student's name and class and persist the profile.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::Persistence` if the profile cannot be saved.
    pub async fn update_profile(
        &mut self,
        name: impl Into<String>,
        class: impl Into<String>,
    ) -> Result<(), ControllerError> {
        self.profile.set_identity(name, class);
        self.persistence.save_profile(&self.profile).await?;
        Ok(())
    }

    async fn persist_draft(&self) {
        if let Some(session) = self.session.as_ref() {
            if session.state() != SessionState::Submitted {
                self.persistence.save_draft(session.test_id(), session).await;
            }
        }
    }

    fn session_ref(&self) -> Result<&Session, ControllerError> {
        self.session.as_ref().ok_or(ControllerError::NoActiveTest)
    }

    fn session_mut(&mut self) -> Result<&mut Session, ControllerError> {
        self.session.as_mut().ok_or(ControllerError::NoActiveTest)
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }
}

fn changed(did_change: bool) -> CommandOutcome {
    if did_change {
        CommandOutcome::Changed
    } else {
        CommandOutcome::Unchanged
    }
}
