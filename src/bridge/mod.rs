//! HTTP request to SFTP operation bridging

pub mod dispatch;
pub mod listing;
pub mod resolver;
pub mod stream;

pub use dispatch::Bridge;
pub use listing::render_directory;
pub use resolver::{PathResolver, RemotePath, Resolution};
pub use stream::stream_file;
