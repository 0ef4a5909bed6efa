//! Logwrap Logs - Rotating log streams (size/date rotation, expiry, compression)

mod compress;
mod namer;
mod stream;

pub use compress::gzip_file;
pub use namer::backup_path;
pub use stream::LogStream;

pub use logwrap_core::RotationPolicy;
