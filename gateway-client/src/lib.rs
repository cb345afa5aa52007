//! Provider gateway for generated ambient audio
//!
//! Turns one normalized generation request into one provider call and hands
//! back either the finished artifact or a task handle to poll:
//! - Suno (asynchronous, JSON)
//! - Stability AI (synchronous, multipart)
//! - Local MusicGen server (synchronous, JSON)

pub mod ambiance;
pub mod config;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod payload;
pub mod profile;
pub mod providers;
pub mod request;
pub mod result;
pub mod transport;

pub use ambiance::Ambiance;
pub use config::{Config, ProviderConfig};
pub use error::{ErrorKind, GatewayError, Result};
pub use gateway::Gateway;
pub use profile::ProviderProfile;
pub use providers::{ProviderKind, build_profile};
pub use request::{FileBlob, GenerationOptions, GenerationRequest, OutputFormat, ParamValue, param};
pub use result::{Artifact, Generation, GenerationResult, PollableTask, TaskStatus};
pub use transport::{HttpTransport, MockTransport, ReqwestTransport};
