use askama::Template;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;
use std::sync::{Arc, Mutex};

use crate::config::{Config, SmtpConfig};
use crate::services::otp::OTP_TTL_MINUTES;

#[derive(thiserror::Error, Debug)]
pub enum MailError {
    #[error("Invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Failed to build email: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[derive(Template)]
#[template(path = "emails/otp.html")]
struct OtpHtml<'a> {
    code: &'a str,
    minutes: i64,
}

#[derive(Template)]
#[template(path = "emails/otp.txt")]
struct OtpText<'a> {
    code: &'a str,
    minutes: i64,
}

#[derive(Template)]
#[template(path = "emails/welcome.html")]
struct WelcomeHtml<'a> {
    name: &'a str,
}

#[derive(Template)]
#[template(path = "emails/welcome.txt")]
struct WelcomeText<'a> {
    name: &'a str,
}

#[derive(Template)]
#[template(path = "emails/password_reset.html")]
struct PasswordResetHtml<'a> {
    code: &'a str,
    minutes: i64,
}

#[derive(Template)]
#[template(path = "emails/password_reset.txt")]
struct PasswordResetText<'a> {
    code: &'a str,
    minutes: i64,
}

#[derive(Template)]
#[template(path = "emails/booking_confirmation.html")]
struct BookingHtml<'a> {
    customer_name: &'a str,
    reference: &'a str,
    service: &'a str,
    booking_date: &'a str,
    total: &'a str,
    status: &'a str,
}

#[derive(Template)]
#[template(path = "emails/booking_confirmation.txt")]
struct BookingText<'a> {
    customer_name: &'a str,
    reference: &'a str,
    service: &'a str,
    booking_date: &'a str,
    total: &'a str,
    status: &'a str,
}

/// Details shown in a booking confirmation.
#[derive(Debug, Clone)]
pub struct BookingSummary {
    pub customer_name: String,
    pub reference: String,
    pub service: String,
    pub booking_date: String,
    pub final_price: i64,
    pub status: String,
}

pub fn otp_email(to: &str, code: &str) -> Result<OutgoingEmail, MailError> {
    Ok(OutgoingEmail {
        to: to.to_string(),
        subject: "Your verification code".to_string(),
        text: OtpText {
            code,
            minutes: OTP_TTL_MINUTES,
        }
        .render()?,
        html: OtpHtml {
            code,
            minutes: OTP_TTL_MINUTES,
        }
        .render()?,
    })
}

pub fn welcome_email(to: &str, name: &str) -> Result<OutgoingEmail, MailError> {
    Ok(OutgoingEmail {
        to: to.to_string(),
        subject: "Welcome to Shutterbook".to_string(),
        text: WelcomeText { name }.render()?,
        html: WelcomeHtml { name }.render()?,
    })
}

pub fn password_reset_email(to: &str, code: &str) -> Result<OutgoingEmail, MailError> {
    Ok(OutgoingEmail {
        to: to.to_string(),
        subject: "Reset your password".to_string(),
        text: PasswordResetText {
            code,
            minutes: OTP_TTL_MINUTES,
        }
        .render()?,
        html: PasswordResetHtml {
            code,
            minutes: OTP_TTL_MINUTES,
        }
        .render()?,
    })
}

pub fn booking_confirmation_email(
    to: &str,
    summary: &BookingSummary,
) -> Result<OutgoingEmail, MailError> {
    let total = format_money(summary.final_price);
    Ok(OutgoingEmail {
        to: to.to_string(),
        subject: format!("Booking received ({})", summary.reference),
        text: BookingText {
            customer_name: &summary.customer_name,
            reference: &summary.reference,
            service: &summary.service,
            booking_date: &summary.booking_date,
            total: &total,
            status: &summary.status,
        }
        .render()?,
        html: BookingHtml {
            customer_name: &summary.customer_name,
            reference: &summary.reference,
            service: &summary.service,
            booking_date: &summary.booking_date,
            total: &total,
            status: &summary.status,
        }
        .render()?,
    })
}

/// Formats minor units as a decimal amount, e.g. `12345` -> `123.45`.
pub fn format_money(minor_units: i64) -> String {
    let sign = if minor_units < 0 { "-" } else { "" };
    let abs = minor_units.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(smtp: &SmtpConfig, from: &str) -> Result<Self, MailError> {
        let credentials = Credentials::new(
            smtp.username.clone(),
            smtp.password.expose_secret().clone(),
        );

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)?
            .port(smtp.port)
            .credentials(credentials)
            .build();

        Ok(Self {
            transport,
            from: from.parse()?,
        })
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(email.to.parse()?)
            .subject(email.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                email.text.clone(),
                email.html.clone(),
            ))?;

        self.transport.send(message).await?;
        Ok(())
    }
}

/// Collected messages of an in-memory mailer.
pub type Outbox = Arc<Mutex<Vec<OutgoingEmail>>>;

/// Email delivery backend.
pub enum Mailer {
    /// Real delivery over SMTP.
    Smtp(SmtpMailer),
    /// Dev mode: messages are written to the log instead of being sent.
    Console,
    /// Messages are kept in memory (tests).
    Memory(Outbox),
}

impl Mailer {
    pub fn from_config(config: &Config) -> Result<Self, MailError> {
        match (&config.smtp, config.dev_mode) {
            (Some(smtp), false) => Ok(Mailer::Smtp(SmtpMailer::new(smtp, &config.mail_from)?)),
            _ => Ok(Mailer::Console),
        }
    }

    /// Transport name reported by the health check
    pub fn transport(&self) -> &'static str {
        match self {
            Mailer::Smtp(_) => "smtp",
            Mailer::Console => "console",
            Mailer::Memory(_) => "memory",
        }
    }

    pub fn memory() -> (Self, Outbox) {
        let outbox: Outbox = Arc::new(Mutex::new(Vec::new()));
        (Mailer::Memory(outbox.clone()), outbox)
    }

    pub async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        match self {
            Mailer::Smtp(smtp) => {
                smtp.send(&email).await?;
                tracing::info!(to = %email.to, subject = %email.subject, "Email sent");
            }
            Mailer::Console => {
                tracing::info!(
                    to = %email.to,
                    subject = %email.subject,
                    body = %email.text,
                    "Email (dev mode, not delivered)"
                );
            }
            Mailer::Memory(outbox) => {
                if let Ok(mut sent) = outbox.lock() {
                    sent.push(email);
                }
            }
        }
        Ok(())
    }

    /// Sends a message whose failure must not fail the surrounding request.
    pub async fn send_best_effort(&self, email: Result<OutgoingEmail, MailError>) {
        let result = match email {
            Ok(email) => self.send(email).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to send email");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_otp_email_contains_code() {
        let email = otp_email("jane@example.com", "042042").unwrap();
        assert_eq!(email.to, "jane@example.com");
        assert!(email.text.contains("042042"));
        assert!(email.html.contains("042042"));
        assert!(email.text.contains("10 minutes"));
    }

    #[test]
    fn test_welcome_email_escapes_html() {
        let email = welcome_email("jane@example.com", "<b>Jane</b>").unwrap();
        assert!(email.text.contains("<b>Jane</b>"));
        assert!(!email.html.contains("<b>Jane</b>"));
    }

    #[test]
    fn test_booking_confirmation() {
        let summary = BookingSummary {
            customer_name: "Jane".to_string(),
            reference: "ABCD1234".to_string(),
            service: "Wedding package".to_string(),
            booking_date: "2026-06-01".to_string(),
            final_price: 150_000,
            status: "pending".to_string(),
        };
        let email = booking_confirmation_email("jane@example.com", &summary).unwrap();
        assert!(email.subject.contains("ABCD1234"));
        assert!(email.text.contains("1500.00"));
        assert!(email.html.contains("Wedding package"));
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(0), "0.00");
        assert_eq!(format_money(5), "0.05");
        assert_eq!(format_money(12345), "123.45");
        assert_eq!(format_money(-250), "-2.50");
    }

    #[tokio::test]
    async fn test_memory_mailer_collects() {
        let (mailer, outbox) = Mailer::memory();
        mailer
            .send(otp_email("jane@example.com", "123456").unwrap())
            .await
            .unwrap();
        assert_eq!(outbox.lock().unwrap().len(), 1);
    }
}
