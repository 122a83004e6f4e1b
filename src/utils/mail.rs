//! Handles email stuff.

use lettre::{
    message::{Mailbox, MultiPart},
    transport::stub::AsyncStubTransport,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::{config::Config, error::ServerError, models::user};

/// Where outgoing mail goes.
#[derive(Clone)]
pub enum Mailer {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    /// Keeps messages in memory; used when no SMTP server is configured.
    Stub(AsyncStubTransport),
}

impl Mailer {
    pub fn from_config(config: &Config) -> Result<Self, ServerError> {
        match &config.smtp_url {
            Some(url) => Ok(Mailer::Smtp(
                AsyncSmtpTransport::<Tokio1Executor>::from_url(url)?.build(),
            )),
            None => {
                tracing::warn!("SMTP_URL is not set, outgoing mail will only be logged");
                Ok(Mailer::Stub(AsyncStubTransport::new_ok()))
            }
        }
    }

    pub async fn send(&self, mail: Message) -> Result<(), ServerError> {
        match self {
            Mailer::Smtp(transport) => {
                transport.send(mail).await?;
            }
            Mailer::Stub(transport) => {
                tracing::info!(
                    "not sending mail to {:?}: {:?}",
                    mail.envelope().to(),
                    mail.headers().get_raw("Subject")
                );
                transport.send(mail).await.map_err(anyhow::Error::from)?;
            }
        }
        Ok(())
    }
}

/// Send `to` an email with both a plain text and an HTML body.
pub async fn send_email(
    mailer: &Mailer,
    config: &Config,
    to: &str,
    subject: &str,
    text: String,
    html: String,
) -> Result<(), ServerError> {
    let to: Mailbox = to
        .parse()
        .map_err(|e| anyhow::format_err!("invalid recipient {to:?}: {e}"))?;
    let mail = Message::builder()
        .from(config.mail_sender.clone())
        .to(to)
        .subject(format!("{}{}", config.mail_subject_prefix, subject))
        .multipart(MultiPart::alternative_plain_html(text, html))?;

    mailer.send(mail).await
}

pub async fn send_confirmation(
    mailer: &Mailer,
    config: &Config,
    user: &user::Model,
    token: &str,
) -> Result<(), ServerError> {
    let link = format!("/confirm/{token}");
    send_email(
        mailer,
        config,
        &user.email,
        "Confirm your account",
        format!(
            "Dear {name},\n\nWelcome to lastweek! To confirm your account please open the following link:\n\n{link}\n\nThe link expires in one hour.\n",
            name = user.name,
        ),
        format!(
            "<p>Dear {name},</p><p>Welcome to lastweek! To confirm your account please <a href=\"{link}\">click here</a>.</p><p>The link expires in one hour.</p>",
            name = crate::pages::escape(&user.name),
        ),
    )
    .await
}

pub async fn send_reset(
    mailer: &Mailer,
    config: &Config,
    user: &user::Model,
    token: &str,
) -> Result<(), ServerError> {
    let link = format!("/reset/{token}");
    send_email(
        mailer,
        config,
        &user.email,
        "Reset your password",
        format!(
            "Dear {name},\n\nTo reset your password open the following link:\n\n{link}\n\nIf you have not requested a password reset simply ignore this message.\n",
            name = user.name,
        ),
        format!(
            "<p>Dear {name},</p><p>To reset your password <a href=\"{link}\">click here</a>.</p><p>If you have not requested a password reset simply ignore this message.</p>",
            name = crate::pages::escape(&user.name),
        ),
    )
    .await
}
