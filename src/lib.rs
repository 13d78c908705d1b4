use std::{convert::Infallible, fs, path::PathBuf};

use anyhow::Context;
use lettre::{
    message::Mailbox,
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
        SUBMISSIONS_PORT, SUBMISSION_PORT,
    },
    AsyncFileTransport, AsyncSmtpTransport, Tokio1Executor,
};
use tracing::warn;

pub mod email;
pub mod http;
pub mod telemetry;
pub mod token;

/// Display name used for every outgoing message.
pub const SENDER_NAME: &str = "Pudo Business Partners Support";

/// Interprets a boolean-like string. Only `true` (any case) is truthy.
fn parse_flag(s: &str) -> Result<bool, Infallible> {
    Ok(s.trim().eq_ignore_ascii_case("true"))
}

#[derive(clap::Parser)]
#[clap(version, about)]
pub struct Config {
    #[clap(long, env, default_value = "4000")]
    pub port: u16,

    #[clap(long, env)]
    pub smtp_host: Option<String>,

    /// Defaults to 465 when `smtp_secure` is set, 587 otherwise.
    #[clap(long, env)]
    pub smtp_port: Option<u16>,

    /// Use implicit TLS instead of opportunistic STARTTLS.
    #[clap(long, env, action = clap::ArgAction::Set, default_value = "false", value_parser = parse_flag)]
    pub smtp_secure: bool,

    #[clap(long = "smtp-user", env = "SMTP_USER")]
    pub smtp_username: Option<String>,

    #[clap(long = "smtp-pass", env = "SMTP_PASS", hide_env_values = true)]
    pub smtp_password: Option<String>,

    /// Skip certificate validation toward the relay. Only for relays with
    /// self-signed certificates.
    #[clap(long, env, action = clap::ArgAction::Set, default_value = "false", value_parser = parse_flag)]
    pub smtp_accept_invalid_certs: bool,

    /// Sender address. Falls back to `SMTP_USER`.
    #[clap(long, env)]
    pub mail_from: Option<String>,

    /// Base of the link embedded in reset emails. The token is appended as `?token=`.
    #[clap(long, env, default_value = "https://pudo.com.tr/reset-password")]
    pub password_reset_url: String,

    /// Where messages are written when no SMTP host is configured.
    #[clap(long, env, default_value = "mails")]
    pub mail_dir: PathBuf,

    #[clap(long, env, default_value = "logs/app.log")]
    pub log_file: PathBuf,
}

impl Config {
    pub fn sender(&self) -> anyhow::Result<Mailbox> {
        let address = self
            .mail_from
            .as_deref()
            .or(self.smtp_username.as_deref())
            .context("no sender address; set MAIL_FROM or SMTP_USER")?;

        let address = address
            .parse()
            .with_context(|| format!("invalid sender address {address:?}"))?;

        Ok(Mailbox::new(Some(SENDER_NAME.into()), address))
    }

    pub fn email_transport(&self) -> anyhow::Result<email::Transport> {
        let host = match self.smtp_host {
            Some(ref host) => host,
            None => {
                warn!(
                    "SMTP_HOST is not set; writing mail to {}",
                    self.mail_dir.display()
                );
                fs::create_dir_all(&self.mail_dir).with_context(|| {
                    format!("failed to create mail directory {}", self.mail_dir.display())
                })?;
                return Ok(email::Transport::File {
                    transport: AsyncFileTransport::new(&self.mail_dir),
                    dir: self.mail_dir.clone(),
                });
            }
        };

        if self.smtp_accept_invalid_certs {
            warn!("certificate validation toward {host} is disabled");
        }

        let params = TlsParameters::builder(host.clone())
            .dangerous_accept_invalid_certs(self.smtp_accept_invalid_certs)
            .build_rustls()
            .context("invalid tls parameters")?;

        let (tls, default_port) = if self.smtp_secure {
            (Tls::Wrapper(params), SUBMISSIONS_PORT)
        } else {
            (Tls::Opportunistic(params), SUBMISSION_PORT)
        };

        let mut smtp = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            .port(self.smtp_port.unwrap_or(default_port))
            .tls(tls);

        match (self.smtp_username.as_ref(), self.smtp_password.as_ref()) {
            (Some(username), Some(password)) => {
                smtp = smtp.credentials(Credentials::new(username.clone(), password.clone()));
            }
            _ => warn!("smtp credentials are missing; skipping auth"),
        }

        Ok(email::Transport::Smtp(smtp.build()))
    }

    pub fn email_client(&self) -> anyhow::Result<email::Client> {
        email::Client::new(
            self.sender()?,
            self.email_transport()?,
            self.password_reset_url.clone(),
        )
        .context("failed to register email templates")
    }
}
