//! HTTP transport to the camera, with an on-disk response cache.
//!
//! # Example
//!
//! ```no_run
//! use olyshare_core::transport::{CameraClient, ResponseCache};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = CameraClient::new("http://192.168.0.10", Some(ResponseCache::new(".cache")))?;
//! let content_type = client.probe_content_type("/DCIM/100OLYMP/P3300029.JPG").await?;
//! println!("{content_type:?}");
//! # Ok(())
//! # }
//! ```

mod cache;
mod client;
pub mod constants;
mod error;

pub use cache::{CachedHead, ResponseCache};
pub use client::CameraClient;
pub use error::TransportError;
