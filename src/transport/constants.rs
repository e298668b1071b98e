//! Constants for the camera transport (timeouts, camera defaults).

/// Default HTTP connect timeout. Camera Wi-Fi is local, so fail fast.
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default total request timeout (RAW files and movies can be large).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Address the camera serves on when acting as an access point.
pub const DEFAULT_CAMERA_URL: &str = "http://192.168.0.10";

/// Directory listed when no other is configured.
pub const DEFAULT_IMAGE_DIR: &str = "/DCIM/100OLYMP";

/// Listing endpoint path on the camera.
pub const LISTING_ENDPOINT: &str = "/get_imglist.cgi";
