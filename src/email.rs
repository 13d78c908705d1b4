use std::{
    io,
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use handlebars::Handlebars;
use lettre::{
    message::{Mailbox, MultiPart},
    AsyncFileTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, instrument};

use crate::token::ResetToken;

pub const PASSWORD_RESET_SUBJECT: &str = "Password Reset Request";

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Address(#[from] lettre::address::AddressError),
    #[error(transparent)]
    Message(#[from] lettre::error::Error),
    #[error(transparent)]
    Render(#[from] handlebars::RenderError),
    #[error(transparent)]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error(transparent)]
    File(#[from] lettre::transport::file::Error),
    #[error("mail directory {}: {source}", .dir.display())]
    MailDir { dir: PathBuf, source: io::Error },
    #[error("relay did not accept the connection test")]
    Unreachable,
    #[error("{0}")]
    Rejected(String),
}

/// A composed message, owned by a single send.
#[derive(Debug, Clone)]
pub struct MailMessage {
    pub from: Mailbox,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

impl MailMessage {
    /// Builds the wire message. The recipient is only checked here, by the
    /// mail library's own address parser.
    pub fn build(&self) -> Result<Message, Error> {
        let to: Mailbox = self.to.parse()?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(self.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                self.text.clone(),
                self.html.clone(),
            ))?;

        Ok(message)
    }
}

/// Records every dispatch attempt in memory instead of delivering it.
#[derive(Debug, Clone, Default)]
pub struct Outbox(Arc<Mutex<OutboxState>>);

#[derive(Debug, Default)]
struct OutboxState {
    attempts: Vec<MailMessage>,
    failure: Option<String>,
    unreachable: Option<String>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent sends fail with `detail`.
    pub fn fail_with(&self, detail: impl Into<String>) {
        self.state().failure = Some(detail.into());
    }

    /// Makes the connection test fail with `detail`. Sends are unaffected.
    pub fn unreachable(&self, detail: impl Into<String>) {
        self.state().unreachable = Some(detail.into());
    }

    /// Every message handed to the transport so far, failed ones included.
    pub fn attempts(&self) -> Vec<MailMessage> {
        self.state().attempts.clone()
    }

    fn state(&self) -> MutexGuard<'_, OutboxState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn deliver(&self, message: MailMessage) -> Result<(), Error> {
        let mut state = self.state();
        state.attempts.push(message);

        match state.failure {
            Some(ref detail) => Err(Error::Rejected(detail.clone())),
            None => Ok(()),
        }
    }

    fn test_connection(&self) -> Result<(), Error> {
        match self.state().unreachable {
            Some(ref detail) => Err(Error::Rejected(detail.clone())),
            None => Ok(()),
        }
    }
}

pub enum Transport {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    File {
        transport: AsyncFileTransport<Tokio1Executor>,
        dir: PathBuf,
    },
    Memory(Outbox),
}

#[derive(Serialize)]
struct ResetContext<'a> {
    link: &'a str,
}

pub struct Client {
    from: Mailbox,
    transport: Transport,
    password_reset_url: String,
    templates: Handlebars<'static>,
}

impl Client {
    pub fn new(
        from: Mailbox,
        transport: Transport,
        password_reset_url: impl Into<String>,
    ) -> Result<Self, handlebars::TemplateError> {
        let mut templates = Handlebars::new();

        templates.register_template_string(
            "password_reset.html",
            include_str!("templates/password_reset.html"),
        )?;
        templates.register_template_string(
            "password_reset.txt",
            include_str!("templates/password_reset.txt"),
        )?;

        Ok(Self {
            from,
            transport,
            password_reset_url: password_reset_url.into(),
            templates,
        })
    }

    /// Composes the reset email for `to` carrying `token`.
    pub fn password_reset(&self, to: &str, token: &ResetToken) -> Result<MailMessage, Error> {
        let link = token.link(&self.password_reset_url);
        let ctx = ResetContext { link: &link };

        Ok(MailMessage {
            from: self.from.clone(),
            to: to.to_owned(),
            subject: PASSWORD_RESET_SUBJECT.into(),
            html: self.templates.render("password_reset.html", &ctx)?,
            text: self.templates.render("password_reset.txt", &ctx)?,
        })
    }

    #[instrument(skip_all)]
    pub async fn send(&self, message: MailMessage) -> Result<(), Error> {
        let email = message.build()?;

        match self.transport {
            Transport::Smtp(ref smtp) => {
                smtp.send(email).await?;
            }
            Transport::File { ref transport, .. } => {
                let id = transport.send(email).await?;
                debug!(%id, "message written to disk");
            }
            Transport::Memory(ref outbox) => outbox.deliver(message)?,
        }

        Ok(())
    }

    /// Performs a handshake with the relay. The file transport only checks
    /// that its directory exists.
    pub async fn verify(&self) -> Result<(), Error> {
        match self.transport {
            Transport::Smtp(ref smtp) => {
                if smtp.test_connection().await? {
                    Ok(())
                } else {
                    Err(Error::Unreachable)
                }
            }
            Transport::File { ref dir, .. } => match tokio::fs::metadata(dir).await {
                Ok(meta) if meta.is_dir() => Ok(()),
                Ok(_) => Err(Error::MailDir {
                    dir: dir.clone(),
                    source: io::Error::new(io::ErrorKind::Other, "not a directory"),
                }),
                Err(source) => Err(Error::MailDir {
                    dir: dir.clone(),
                    source,
                }),
            },
            Transport::Memory(ref outbox) => outbox.test_connection(),
        }
    }

    /// Runs [`Client::verify`] and logs the outcome. A failure is not fatal;
    /// sends are still attempted afterwards.
    pub async fn self_check(&self) -> bool {
        match (self.verify().await, &self.transport) {
            (Ok(()), Transport::File { dir, .. }) => {
                info!(
                    "no SMTP relay configured; writing mail to {}",
                    dir.display()
                );
                true
            }
            (Ok(()), _) => {
                info!("SMTP server successfully connected.");
                true
            }
            (Err(e), _) => {
                error!("SMTP connection error: {e}");
                false
            }
        }
    }
}
