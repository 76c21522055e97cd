//! Runtime configuration.
//!
//! Every setting is a command-line flag with an environment fallback, so the
//! same binary runs from a shell or a container spec:
//!
//! ```bash
//! stowage --addr 0.0.0.0:8080 --upload-dir /data/uploads
//! STOWAGE_MAX_FILE_SIZE=52428800 stowage
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

/// 10 MiB per file.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Read buffer for streaming writes.
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

pub const DEFAULT_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".pdf"];

pub const DEFAULT_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/png", "application/pdf"];

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "stowage", version, about = "Size-bounded file upload service")]
pub struct Args {
    /// Address to listen on.
    #[arg(long, env = "STOWAGE_ADDR", default_value = "0.0.0.0:3000")]
    pub addr: SocketAddr,

    /// Directory all uploads are confined to. Created if missing.
    #[arg(long, env = "STOWAGE_UPLOAD_DIR", default_value = "var/uploads")]
    pub upload_dir: PathBuf,

    /// Largest accepted file, in bytes.
    #[arg(long, env = "STOWAGE_MAX_FILE_SIZE", default_value_t = DEFAULT_MAX_FILE_SIZE)]
    pub max_file_size: u64,

    /// Read buffer size for streaming writes, in bytes.
    #[arg(long, env = "STOWAGE_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Comma-separated extension allow-list.
    #[arg(
        long,
        env = "STOWAGE_ALLOWED_EXTENSIONS",
        value_delimiter = ',',
        default_values = DEFAULT_EXTENSIONS
    )]
    pub allowed_extensions: Vec<String>,

    /// Comma-separated MIME type allow-list.
    #[arg(
        long,
        env = "STOWAGE_ALLOWED_MIME_TYPES",
        value_delimiter = ',',
        default_values = DEFAULT_MIME_TYPES
    )]
    pub allowed_mime_types: Vec<String>,
}

impl Args {
    pub fn upload_config(&self) -> UploadConfig {
        UploadConfig {
            root: self.upload_dir.clone(),
            max_file_size: self.max_file_size,
            chunk_size: self.chunk_size,
            allowed_extensions: self.allowed_extensions.clone(),
            allowed_mime_types: self.allowed_mime_types.clone(),
            url_prefix: crate::routes::UPLOAD_PREFIX.to_owned(),
        }
    }
}

/// Settings for [`Uploads`](crate::upload::Uploads). Fixed for the life of
/// the process.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub root: PathBuf,
    pub max_file_size: u64,
    pub chunk_size: usize,
    pub allowed_extensions: Vec<String>,
    pub allowed_mime_types: Vec<String>,
    /// Prefix of the `url` field in stored-file records.
    pub url_prefix: String,
}

impl UploadConfig {
    /// Defaults everywhere except the storage root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), ..Self::default() }
    }

    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    pub fn chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes;
        self
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("var/uploads"),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            allowed_extensions: DEFAULT_EXTENSIONS.map(String::from).to_vec(),
            allowed_mime_types: DEFAULT_MIME_TYPES.map(String::from).to_vec(),
            url_prefix: crate::routes::UPLOAD_PREFIX.to_owned(),
        }
    }
}
