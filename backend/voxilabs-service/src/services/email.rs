/// Email delivery for verification codes and password reset links
use crate::config::EmailSettings;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use lettre::message::{header, Mailbox, Message, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use std::sync::Arc;
use tracing::{info, warn};

/// A rendered message ready to hand to a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: Option<String>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<()>;
}

/// Async SMTP transport wrapper (SMTP or no-op)
#[derive(Clone)]
pub struct SmtpMailer {
    transport: Option<Arc<AsyncSmtpTransport<Tokio1Executor>>>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Build the mailer from configuration
    ///
    /// If SMTP host is empty, operates in no-op mode (logs only).
    pub fn new(config: &EmailSettings) -> Result<Self> {
        let from = config
            .smtp_from
            .parse::<Mailbox>()
            .map_err(|e| AppError::Internal(format!("Invalid SMTP_FROM address: {}", e)))?;

        let transport = if config.smtp_host.trim().is_empty() {
            warn!("SMTP host not configured; email service will operate in no-op mode");
            None
        } else {
            let builder = if config.use_starttls {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            } else {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            }
            .map_err(|e| AppError::Internal(format!("Failed to configure SMTP transport: {}", e)))?
            .port(config.smtp_port);

            let builder = if let (Some(username), Some(password)) =
                (&config.smtp_username, &config.smtp_password)
            {
                builder.credentials(Credentials::new(username.to_string(), password.to_string()))
            } else {
                builder
            };

            Some(Arc::new(builder.build()))
        };

        Ok(Self { transport, from })
    }

    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    fn build_message(&self, email: &OutgoingEmail) -> Result<Message> {
        let to = email
            .to
            .parse::<Mailbox>()
            .map_err(|e| AppError::Internal(format!("Invalid recipient address: {}", e)))?;

        let builder = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject.clone());

        let message = match &email.html_body {
            Some(html) => builder.multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(email.text_body.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(html.clone()),
                    ),
            ),
            None => builder
                .header(header::ContentType::TEXT_PLAIN)
                .body(email.text_body.clone()),
        };

        message.map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<()> {
        let Some(transport) = &self.transport else {
            info!(
                recipient = %mask_email(&email.to),
                subject = %email.subject,
                "SMTP disabled; skipping email send"
            );
            return Ok(());
        };

        let message = self.build_message(&email)?;
        transport
            .send(message)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to send email: {}", e)))?;

        info!(recipient = %mask_email(&email.to), subject = %email.subject, "Email sent");
        Ok(())
    }
}

/// `ada@example.com` → `a***@example.com`, for logs
pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let first = local.chars().next().map(String::from).unwrap_or_default();
            format!("{first}***@{domain}")
        }
        None => "***".to_string(),
    }
}

pub fn verification_code_email(to: &str, first_name: &str, code: &str, ttl_minutes: i64) -> OutgoingEmail {
    let text_body = format!(
        "Hi {first_name},\n\n\
         Your VOXILABS verification code is: {code}\n\n\
         The code expires in {ttl_minutes} minutes. A new request replaces it.\n\
         If you did not request this, please ignore this email."
    );
    let html_body = format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; padding: 20px; color: #333;">
    <h2>Verify your email</h2>
    <p>Hi {first_name},</p>
    <p>Your VOXILABS verification code is:</p>
    <p style="font-size: 28px; letter-spacing: 6px; font-weight: bold;">{code}</p>
    <p style="color: #999; font-size: 12px;">The code expires in {ttl_minutes} minutes.</p>
</body>
</html>"#
    );

    OutgoingEmail {
        to: to.to_string(),
        subject: "Your VOXILABS verification code".to_string(),
        text_body,
        html_body: Some(html_body),
    }
}

pub fn password_reset_email(to: &str, first_name: &str, reset_link: &str) -> OutgoingEmail {
    let text_body = format!(
        "Hi {first_name},\n\n\
         We received your password reset request.\n\
         Open the following link to choose a new password:\n{reset_link}\n\n\
         This link will expire in 1 hour.\n\
         If you did not request this, please ignore this email."
    );
    let html_body = format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; padding: 20px; color: #333;">
    <h2>Password Reset Request</h2>
    <p>Hi {first_name},</p>
    <p style="margin: 30px 0;">
        <a href="{reset_link}" style="background-color: #000; color: #fff; padding: 14px 28px; text-decoration: none; border-radius: 25px; display: inline-block;">Reset Password</a>
    </p>
    <p style="color: #999; font-size: 12px;">This link will expire in 1 hour.</p>
</body>
</html>"#
    );

    OutgoingEmail {
        to: to.to_string(),
        subject: "VOXILABS Password Reset".to_string(),
        text_body,
        html_body: Some(html_body),
    }
}
