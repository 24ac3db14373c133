//! 生成処理の型定義
//!
//! CLIとライブラリで共有される型:
//! - Decade: 生成対象の年代ラベル（WorkItem）
//! - GeneratedImage: 生成された画像データ
//! - GenerationStatus: 年代ごとの生成状態

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// 既定の年代一覧（アルバムの並び順）
pub const DEFAULT_DECADES: &[&str] = &["1950s", "1960s", "1970s", "1980s", "1990s", "2000s"];

/// 年代ラベル
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Decade(String);

impl Decade {
    pub fn new(label: impl Into<String>) -> Result<Self> {
        let label = label.into();
        let trimmed = label.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidDecade(label));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn label(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Decade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Decade {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for Decade {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Decade> for String {
    fn from(value: Decade) -> Self {
        value.0
    }
}

/// 既定の年代一覧を生成
pub fn default_decades() -> Vec<Decade> {
    DEFAULT_DECADES.iter().map(|d| Decade(d.to_string())).collect()
}

/// 生成された画像
///
/// 画像データは `Arc` で共有するため、スナップショットの複製は安価。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub mime_type: String,
    pub data: Arc<[u8]>,
}

impl GeneratedImage {
    pub fn new(mime_type: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// 年代ごとの生成状態
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationStatus {
    Pending,
    Done { image: GeneratedImage },
    Error { message: String },
}

impl GenerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStatus::Pending => "pending",
            GenerationStatus::Done { .. } => "done",
            GenerationStatus::Error { .. } => "error",
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, GenerationStatus::Pending)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_pending()
    }

    pub fn image(&self) -> Option<&GeneratedImage> {
        match self {
            GenerationStatus::Done { image } => Some(image),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            GenerationStatus::Error { message } => Some(message),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_decades() {
        let decades = default_decades();
        assert_eq!(decades.len(), 6);
        assert_eq!(decades[0].label(), "1950s");
        assert_eq!(decades[5].label(), "2000s");
    }

    #[test]
    fn test_decade_trims_label() {
        let decade: Decade = " 1970s ".parse().unwrap();
        assert_eq!(decade.label(), "1970s");
        assert!(Decade::new("   ").is_err());
    }

    #[test]
    fn test_decade_serde() {
        let decade = Decade::new("1980s").unwrap();
        let json = serde_json::to_string(&decade).unwrap();
        assert_eq!(json, "\"1980s\"");

        let back: Decade = serde_json::from_str(&json).unwrap();
        assert_eq!(back, decade);
        assert!(serde_json::from_str::<Decade>("\"\"").is_err());
    }

    #[test]
    fn test_status_accessors() {
        let image = GeneratedImage::new("image/png", vec![1u8, 2, 3]);
        let done = GenerationStatus::Done { image: image.clone() };
        assert_eq!(done.as_str(), "done");
        assert!(done.is_terminal());
        assert_eq!(done.image(), Some(&image));

        let error = GenerationStatus::Error { message: "timeout".into() };
        assert_eq!(error.error_message(), Some("timeout"));
        assert!(error.image().is_none());

        assert!(GenerationStatus::Pending.is_pending());
    }
}
