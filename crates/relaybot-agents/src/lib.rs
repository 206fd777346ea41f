pub mod backend;
pub mod dispatcher;
pub mod error;
pub mod openrouter;

pub use backend::{CompletionBackend, CompletionRequest};
pub use dispatcher::{DispatcherSettings, RequestDispatcher};
pub use error::{DispatchError, RATE_LIMIT_INDICATORS, is_rate_limit_text};
pub use openrouter::{OpenRouterBackend, OpenRouterConfig};
