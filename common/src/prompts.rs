//! プロンプト生成モジュール
//!
//! - build_decade_prompt: 年代スタイル変換の指示文
//! - build_fallback_prompt: 画像が返らなかった場合の言い換え版

use crate::types::Decade;

/// 年代スタイル変換プロンプト生成
///
/// # Arguments
/// * `decade` - 対象の年代
///
/// # Returns
/// 画像生成APIに渡す指示文
pub fn build_decade_prompt(decade: &Decade) -> String {
    format!(
        "Reimagine the person in this photo in the style of the {decade}. \
         This includes clothing, hairstyle, photo quality, and the overall aesthetic of that decade. \
         The output must be a photorealistic image showing the person clearly."
    )
}

/// フォールバックプロンプト生成
///
/// 一次プロンプトでモデルが画像を返さなかった場合に使う、より直接的な表現。
pub fn build_fallback_prompt(decade: &Decade) -> String {
    format!(
        "Create a photograph of the person in this image as if they were living in the {decade}. \
         The photograph should capture the distinct fashion, hairstyles, and overall atmosphere of that time period. \
         Ensure the final image is a clear photograph that looks authentic to the era."
    )
}
