pub mod component;
pub mod config;
pub mod controller;
pub mod exception;
pub mod message;
pub mod param;
pub mod pool;
pub mod request;
pub mod response;
pub mod session;
pub mod util;

pub use component::FlashComponent;
pub use config::{Config, FlashConfig};
pub use controller::{Controller, RenderEvent};
pub use exception::{CodedError, Exception};
pub use message::{FlashContent, FlashMessage, FlashOptions};
pub use param::{HttpRequestMethod, HttpVersion};
pub use pool::{SessionPool, SharedSession};
pub use request::Request;
pub use response::Response;
pub use session::{MemorySession, Session};
