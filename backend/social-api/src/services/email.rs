/// Email delivery through the Mailgun HTTP API
use crate::config::MailSettings;
use crate::error::{AppError, Result};
use crate::telemetry::LoggedEmail;
use reqwest::Client as HttpClient;
use std::time::Duration;
use tracing::{debug, info};

const MAILGUN_API_BASE: &str = "https://api.mailgun.net/v3";

/// Mailgun client (or no-op when credentials are missing)
#[derive(Clone)]
pub struct EmailService {
    http_client: HttpClient,
    base_url: String,
    domain: String,
    api_key: String,
}

impl EmailService {
    /// Build the mailer from configuration
    ///
    /// If the Mailgun domain or API key is empty, operates in no-op mode
    /// (logs only). Useful for development and testing.
    pub fn new(settings: &MailSettings) -> Result<Self> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {e}")))?;

        let service = Self {
            http_client,
            base_url: MAILGUN_API_BASE.to_string(),
            domain: settings.domain.trim().to_string(),
            api_key: settings.api_key.trim().to_string(),
        };

        if !service.is_enabled() {
            tracing::warn!("Mailgun not configured; email service will operate in no-op mode");
        }
        Ok(service)
    }

    /// Point the client at another API root (used against mock servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn is_enabled(&self) -> bool {
        !self.domain.is_empty() && !self.api_key.is_empty()
    }

    fn sender(&self) -> String {
        format!("Social API <mailgun@{}>", self.domain)
    }

    /// Send a plain-text email
    pub async fn send_simple_email(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        if !self.is_enabled() {
            info!(
                subject,
                recipient = %LoggedEmail(to),
                "Email service running in no-op mode; skipping actual send"
            );
            return Ok(());
        }

        debug!(subject, recipient = %LoggedEmail(to), "Sending email");

        let url = format!("{}/{}/messages", self.base_url, self.domain);
        let sender = self.sender();
        let form = [
            ("from", sender.as_str()),
            ("to", to),
            ("subject", subject),
            ("text", body),
        ];

        let response = self
            .http_client
            .post(&url)
            .basic_auth("api", Some(&self.api_key))
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Email API request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), body = %body, "Mailgun rejected message");
            return Err(AppError::ExternalService(format!(
                "API request failed with status code {}",
                status.as_u16()
            )));
        }

        info!(subject, "email sent successfully");
        Ok(())
    }

    /// Welcome email carrying the confirmation link
    pub async fn send_user_registration_email(
        &self,
        username: &str,
        email: &str,
        confirmation_url: &str,
    ) -> Result<()> {
        let body = format!(
            "Hi {username}!\n\n\
             You have successfully signed up to the Social REST API.\n\
             Please confirm your email by clicking on the following link:\n\
             {confirmation_url}"
        );
        self.send_simple_email(email, "Successfully signed up", &body)
            .await
    }

    /// Notify the author that their post image is ready
    pub async fn send_image_ready_email(
        &self,
        username: &str,
        email: &str,
        post_url: &str,
        image_url: &str,
    ) -> Result<()> {
        let body = format!(
            "Hi {username}!\n\n\
             Your image has been generated and added to your post.\n\n\
             Please click on the following link to view it:\n\
             {post_url}\n\n\
             Here is the image generated for the post:\n\
             {image_url}"
        );
        self.send_simple_email(email, "Image Generation Completed", &body)
            .await
    }

    /// Notify the author that image generation failed
    pub async fn send_image_failed_email(&self, username: &str, email: &str) -> Result<()> {
        let body = format!(
            "Hi {username}!\n\n\
             Unfortunately there was an error while generating your image."
        );
        self.send_simple_email(email, "Error Generating Image", &body)
            .await
    }
}
