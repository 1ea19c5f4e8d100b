//! Sending the current result set by email through the portal's mailer.

use super::selectors::*;
use super::session::{SessionController, SessionState, ViewerKind};
use super::wait::Condition;
use crate::browser::{Automation, Readiness};
use crate::config::MailSettings;
use crate::error::Result;
use tracing::{info, instrument};

pub struct Notifier<'s, B> {
    session: &'s mut SessionController<B>,
    mail: &'s MailSettings,
}

impl<'s, B: Automation> Notifier<'s, B> {
    pub fn new(session: &'s mut SessionController<B>, mail: &'s MailSettings) -> Self {
        Self { session, mail }
    }

    /// Mail every article in the results list to the configured recipient.
    ///
    /// The mailer popup closes itself once the confirmation alert is
    /// accepted; if it lingers the run continues anyway.
    #[instrument(level = "info", skip(self), fields(recipient = %self.mail.recipient))]
    pub async fn email_results(&mut self, subject: &str) -> Result<()> {
        let mail = self.mail;
        let s = &mut *self.session;
        s.expect_state("email_results", SessionState::OnResultsList)?;

        s.enter_results_frames().await?;
        let before = s.browser().window_handles().await?.len();
        s.waiter()
            .click("email button", EMAIL_BUTTON, Readiness::Clickable)
            .await?;
        let mailer = s.await_new_window("mailer window", Some(before + 1)).await?;
        s.track_popup(&mailer);
        s.activate_window(&mailer).await?;
        s.set_state(SessionState::OnArticleViewer(ViewerKind::Email));

        let w = s.waiter();
        w.type_into("sender name", MAIL_SENDER_NAME, Readiness::Visible, &mail.sender_name)
            .await?;
        w.type_into("sender address", MAIL_SENDER_ADDRESS, Readiness::Visible, &mail.sender_email)
            .await?;
        w.type_into("recipient", MAIL_RECIPIENT, Readiness::Visible, &mail.recipient)
            .await?;
        w.type_into("subject", MAIL_SUBJECT, Readiness::Visible, subject)
            .await?;
        w.click("send button", MAIL_SEND, Readiness::Clickable).await?;
        w.require("mail confirmation", Condition::AlertPresent).await?;
        s.browser().accept_alert().await?;

        let closed = s
            .waiter()
            .optional("mailer window close", Condition::WindowCount(before))
            .await;
        if closed {
            s.forget_popup(&mailer);
        }
        s.activate_main().await?;
        s.set_state(SessionState::OnResultsList);

        info!(subject, "Results emailed");
        Ok(())
    }
}
