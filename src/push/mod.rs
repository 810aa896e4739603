pub mod dispatcher;
pub mod error;
pub mod provider;
pub mod registry;
pub mod render;
pub mod sign;
pub mod token;
pub mod types;

pub use dispatcher::{DispatchReport, PushDispatcher};
pub use error::{PushError, PushResult};
pub use registry::ProviderRegistry;
pub use render::{render, RenderedNotice};
pub use token::{AccessToken, TokenCache, TokenSource};
pub use types::{Message, Payload, PushTag, PushVendor};
