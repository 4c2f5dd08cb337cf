//! Still-image target-size search
//!
//! - `codec`: `ImageCodec` backend trait + `image`-crate implementation
//! - `probe`: header-only dimensions probe
//! - `search`: scale ladder × bounded binary search over quality
//! - `resize`: contain-fit resize tool

pub mod codec;
pub mod probe;
pub mod resize;
pub mod search;

pub use codec::{ImageCodec, ImageRsCodec};
pub use probe::ImageHeaderProbe;
pub use resize::{resize_contain, ResizedImage};
pub use search::{search_image, ImageSearchRequest};
