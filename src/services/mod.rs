//! Auxiliary typed endpoints: each a thin command producer on [`Client`].
//!
//! [`Client`]: crate::client::Client

mod analytics;
mod cloud;
mod config;
mod files;
mod health;
mod schema;
mod server;

pub use config::CloudConfigUpdate;
pub use files::File;
pub use health::ServerHealth;
pub use schema::Schema;
pub use server::ServerInfo;
