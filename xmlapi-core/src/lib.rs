mod client;
mod config;
mod multi_config;
mod version;
mod xml;
pub mod xpath;

pub use client::{SystemInfo, XmlApiClient, XmlApiError};
pub use config::ClientConfig;
pub use multi_config::{MoveWhere, MultiConfigResponse, Operation, OperationResult, render};
pub use version::Version;
pub use xml::Element;
