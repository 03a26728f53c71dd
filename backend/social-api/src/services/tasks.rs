/// Background work detached from the request
///
/// Tasks run on the tokio runtime inside the span of the request that
/// scheduled them, so their log lines keep the request's correlation id.
/// Failures are logged and never reach the client.
use super::{EmailService, ImageGenerationClient};
use crate::db::post_repo;
use crate::error::Result;
use crate::telemetry::LoggedEmail;
use sqlx::PgPool;
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Everything needed to illustrate one post
#[derive(Debug, Clone)]
pub struct ImageJob {
    pub username: String,
    pub email: String,
    pub post_id: i64,
    /// Absolute URL of the post, included in the notification email
    pub post_url: String,
    pub prompt: String,
}

/// Send the registration / reconfirmation email in the background
pub fn spawn_registration_email(
    mailer: EmailService,
    username: String,
    email: String,
    confirmation_url: String,
) -> JoinHandle<()> {
    tokio::spawn(
        async move {
            if let Err(e) = mailer
                .send_user_registration_email(&username, &email, &confirmation_url)
                .await
            {
                tracing::error!(
                    email = %LoggedEmail(&email),
                    "Failed to send registration email: {}",
                    e
                );
            }
        }
        .in_current_span(),
    )
}

/// Generate and attach a post image in the background
pub fn spawn_image_generation(
    db: PgPool,
    mailer: EmailService,
    images: ImageGenerationClient,
    job: ImageJob,
) -> JoinHandle<()> {
    tokio::spawn(
        async move {
            if let Err(e) = generate_and_attach_image(&db, &mailer, &images, &job).await {
                tracing::error!(post_id = job.post_id, "Image generation task failed: {}", e);
            }
        }
        .in_current_span(),
    )
}

/// Generate an image for the post and email the author about the outcome
///
/// Returns the image URL, or `None` when the image API failed (the author
/// is told by email and the post is left without an image).
pub async fn generate_and_attach_image(
    db: &PgPool,
    mailer: &EmailService,
    images: &ImageGenerationClient,
    job: &ImageJob,
) -> Result<Option<String>> {
    let image_url = match images.generate(&job.prompt).await {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(post_id = job.post_id, "Image generation failed: {}", e);
            mailer
                .send_image_failed_email(&job.username, &job.email)
                .await?;
            return Ok(None);
        }
    };

    post_repo::set_image_url(db, job.post_id, &image_url).await?;
    tracing::debug!(post_id = job.post_id, "Image attached to post");

    mailer
        .send_image_ready_email(&job.username, &job.email, &job.post_url, &image_url)
        .await?;

    Ok(Some(image_url))
}
