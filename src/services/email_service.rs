use async_trait::async_trait;
use aws_sdk_sesv2::Client as SesClient;

use crate::{
    config::MailConfig,
    error::{AppError, Result},
    models::CodePurpose,
    stores::CodeSender,
};

/// Delivers one-time codes over AWS SES.
pub struct SesSender {
    client: SesClient,
    sender_email: String,
    from_name: String,
}

impl SesSender {
    pub fn new(client: SesClient, mail: &MailConfig) -> Self {
        Self {
            client,
            sender_email: mail.sender_email.clone(),
            from_name: mail.from_name.clone(),
        }
    }
}

#[async_trait]
impl CodeSender for SesSender {
    async fn send_code(
        &self,
        to: &str,
        code: &str,
        purpose: CodePurpose,
        name: Option<&str>,
    ) -> Result<()> {
        let (subject_line, title, body_text) = match purpose {
            CodePurpose::EmailVerification => (
                "Verify Your Email",
                "Verify Your Email",
                "Use the code below to verify your email address and activate your account.",
            ),
            CodePurpose::PasswordReset => (
                "Your Password Reset Code",
                "Reset Your Password",
                "Use the code below to reset your password.",
            ),
        };

        let html_template = include_str!("code_email.html");
        let greeting = name.map(|n| format!(" {}", n)).unwrap_or_default();
        let html = html_template
            .replace("{{title}}", title)
            .replace("{{name}}", &greeting)
            .replace("{{body}}", body_text)
            .replace("{{code}}", code);

        let destination = aws_sdk_sesv2::types::Destination::builder()
            .to_addresses(to)
            .build();

        let subject = aws_sdk_sesv2::types::Content::builder()
            .data(subject_line)
            .charset("UTF-8")
            .build()
            .map_err(|e| AppError::InternalError(format!("Failed to build subject: {}", e)))?;

        let html_body = aws_sdk_sesv2::types::Content::builder()
            .data(html)
            .charset("UTF-8")
            .build()
            .map_err(|e| AppError::InternalError(format!("Failed to build HTML body: {}", e)))?;

        let body = aws_sdk_sesv2::types::Body::builder().html(html_body).build();

        let message = aws_sdk_sesv2::types::Message::builder()
            .subject(subject)
            .body(body)
            .build();

        let content = aws_sdk_sesv2::types::EmailContent::builder()
            .simple(message)
            .build();

        self.client
            .send_email()
            .from_email_address(format!("{} <{}>", self.from_name, self.sender_email))
            .destination(destination)
            .content(content)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send email: {:?}", e);
                AppError::ServiceUnavailable(
                    "Failed to send verification email. Please try again.".to_string(),
                )
            })?;

        Ok(())
    }
}
