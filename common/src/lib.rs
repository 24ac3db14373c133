//! Retro Album Common Library
//!
//! CLIとライブラリ本体で共有される型とユーティリティ

pub mod types;
pub mod layout;
pub mod error;
pub mod parser;
pub mod prompts;

pub use types::{default_decades, Decade, GeneratedImage, GenerationStatus, DEFAULT_DECADES};
pub use layout::{AlbumLayout, CardGeometry, CardPlacement, CardTransform, Rect};
pub use error::{Error, Result};
pub use parser::{
    parse_api_error, parse_generation_response, to_data_url, ApiErrorBody, GenerationResponse,
};
pub use prompts::{build_decade_prompt, build_fallback_prompt};
