/// Outbound integrations and background work
///
/// - `email`: Mailgun client
/// - `image_generation`: DeepAI client
/// - `storage`: bucket uploads behind the `ObjectStore` trait
/// - `tasks`: detached email and image jobs
pub mod email;
pub mod image_generation;
pub mod storage;
pub mod tasks;

pub use email::EmailService;
pub use image_generation::ImageGenerationClient;
pub use storage::{build_object_store, GcsStorageClient, ObjectStore, UnconfiguredStore};
pub use tasks::ImageJob;
