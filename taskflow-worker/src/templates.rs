/// Email templates
///
/// Bodies are Askama HTML templates under `templates/email/`, so every
/// interpolated value is HTML-escaped.

use askama::Template;
use taskflow_shared::auth::code::CODE_TTL_MINUTES;

use crate::transports::EmailMessage;

pub const VERIFICATION_SUBJECT: &str = "Your TaskFlow verification code";
pub const WELCOME_SUBJECT: &str = "Welcome to TaskFlow!";

/// HTML template for the verification code email.
#[derive(Template)]
#[template(path = "email/verification_code.html")]
struct VerificationCodeEmailHtml<'a> {
    code: &'a str,
    ttl_minutes: i64,
}

/// HTML template for the welcome email.
#[derive(Template)]
#[template(path = "email/welcome.html")]
struct WelcomeEmailHtml<'a> {
    name: &'a str,
    tasks_url: &'a str,
}

/// Renders the verification code email.
///
/// # Errors
///
/// Returns error if the template fails to render.
pub fn verification_code_email(to: &str, code: &str) -> Result<EmailMessage, askama::Error> {
    let html = VerificationCodeEmailHtml {
        code,
        ttl_minutes: CODE_TTL_MINUTES,
    }
    .render()?;

    Ok(EmailMessage {
        to: to.to_string(),
        subject: VERIFICATION_SUBJECT.to_string(),
        html,
    })
}

/// Renders the welcome email sent after verification.
///
/// # Errors
///
/// Returns error if the template fails to render.
pub fn welcome_email(to: &str, name: &str, base_url: &str) -> Result<EmailMessage, askama::Error> {
    let tasks_url = format!("{}/tasks", base_url.trim_end_matches('/'));
    let html = WelcomeEmailHtml {
        name,
        tasks_url: &tasks_url,
    }
    .render()?;

    Ok(EmailMessage {
        to: to.to_string(),
        subject: WELCOME_SUBJECT.to_string(),
        html,
    })
}

/// Pulls the code back out of a rendered verification email.
#[cfg(test)]
pub(crate) fn extract_code(html: &str) -> Option<&str> {
    let start = html.find(r#"<div class="code">"#)? + r#"<div class="code">"#.len();
    html.get(start..start + taskflow_shared::auth::code::CODE_LENGTH)
}
