// Proxy module - image request handling and the Pingora service around it

pub mod handler;
pub mod helpers;
pub mod request;
pub mod response;
pub mod service;

pub use handler::ImageProxy;
pub use request::ImageRequest;
pub use response::ProxyResponse;
pub use service::EdgepixService;
