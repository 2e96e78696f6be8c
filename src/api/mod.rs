//! The uniform dispatch layer: endpoints, request options, transport and
//! commands. Queries and operations both compile down to a [`Command`];
//! nothing else in the crate talks to the network.

mod command;
mod options;
mod transport;

pub use command::Command;
pub use options::{CachePolicy, RequestOption, RequestOptions};
pub use transport::{
    CancellationToken, HttpTransport, ProgressFn, Transport, TransportRequest, TransportResponse,
};

/// HTTP methods used by the API. The backend does not support PATCH, so
/// field-level diff updates go out as PUT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

/// Closed set of API endpoints. Record types select their family here rather
/// than via inheritance; everything else is a fixed path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Objects,
    Users,
    Installations,
    Sessions,
}

impl Endpoint {
    /// Path for the whole class (create, query).
    pub fn class_path(&self, class_name: &str) -> String {
        match self {
            Endpoint::Objects => format!("/classes/{}", class_name),
            Endpoint::Users => "/users".to_string(),
            Endpoint::Installations => "/installations".to_string(),
            Endpoint::Sessions => "/sessions".to_string(),
        }
    }

    /// Path for one instance (fetch, update, delete).
    pub fn instance_path(&self, class_name: &str, object_id: &str) -> String {
        format!("{}/{}", self.class_path(class_name), object_id)
    }
}
