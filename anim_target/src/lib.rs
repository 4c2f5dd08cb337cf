//! Animated-image target-size search
//!
//! - `search`: scale × frame-rate grid with early exit
//! - `best_slot`: single-artifact holder, deletes losers on the spot
//! - `codec` / `palette`: ffmpeg two-pass palette GIF pipeline
//! - `convert`: one-shot video → GIF

pub mod best_slot;
pub mod codec;
pub mod convert;
pub mod palette;
pub mod search;


pub use best_slot::{BestSlot, Trial};
pub use codec::{AnimatedCodec, FfmpegGifCodec};
pub use convert::{convert_to_gif, GifConvertOptions};
pub use search::{search_animated, AnimatedSearchRequest};
