//! アルバム合成
//!
//! 完成した年代画像をポラロイド風カードとして1枚のページに並べる。
//!
//! 1. 全入力をデコード（1枚でも失敗したら全体を失敗にする）
//! 2. レイアウト計算（セル・カード寸法・回転）を値として確定
//! 3. SVGを組み立て、resvg でラスタライズ
//! 4. JPEG にエンコード

use crate::error::{Result, RetroAlbumError};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use retro_album_common::layout::{
    letterbox, AlbumLayout, CardPlacement, Rect, ALBUM_JPEG_QUALITY, BACKGROUND_COLOR,
    MAX_ROTATION_RAD, SHADOW_BLUR_PX, SHADOW_OFFSET_X_PX, SHADOW_OFFSET_Y_PX, SHADOW_OPACITY,
    SUBTITLE_FONT_PX, SUBTITLE_TEXT, SUBTITLE_Y_PX, TITLE_FONT_PX, TITLE_TEXT, TITLE_Y_PX,
};
use retro_album_common::{to_data_url, Decade, GeneratedImage};
use std::io::Cursor;
use std::sync::{Arc, OnceLock};

const CARD_COLOR: &str = "#FFFFFF";
const PHOTO_BACKDROP_COLOR: &str = "#1A1A1A";
const INK_COLOR: &str = "#333333";
const TITLE_FONT: &str = "Caveat, 'Comic Sans MS', cursive";
const CAPTION_FONT: &str = "'Permanent Marker', 'Comic Sans MS', cursive";

/// 合成オプション
#[derive(Debug, Clone)]
pub struct AlbumOptions {
    pub title: String,
    pub subtitle: String,
    /// 回転角の乱数シード（Noneなら毎回ランダム）
    pub seed: Option<u64>,
    pub jpeg_quality: u8,
}

impl Default for AlbumOptions {
    fn default() -> Self {
        Self {
            title: TITLE_TEXT.to_string(),
            subtitle: SUBTITLE_TEXT.to_string(),
            seed: None,
            jpeg_quality: ALBUM_JPEG_QUALITY,
        }
    }
}

/// デコード済みの写真
#[derive(Debug, Clone)]
pub struct DecodedPhoto {
    pub decade: Decade,
    pub width: u32,
    pub height: u32,
    image: Arc<DynamicImage>,
}

/// 1枚分の描画計画
#[derive(Debug, Clone)]
pub struct PlannedCard {
    pub decade: Decade,
    pub placement: CardPlacement,
    /// カード中心原点での写真矩形（レターボックス済み）
    pub photo: Rect,
}

impl PlannedCard {
    /// 写真中心のキャンバス座標（回転適用後）
    pub fn photo_center_on_canvas(&self) -> (f32, f32) {
        let (x, y) = self.photo.center();
        self.placement.transform.apply(x, y)
    }
}

/// ページ全体の描画計画
#[derive(Debug, Clone)]
pub struct AlbumPlan {
    pub layout: AlbumLayout,
    /// 並び順（描画は逆順）
    pub cards: Vec<PlannedCard>,
}

impl AlbumPlan {
    /// 描画順（後ろの年代から）
    pub fn draw_order(&self) -> impl Iterator<Item = &PlannedCard> {
        self.cards.iter().rev()
    }
}

/// 全件そろっていて、キャンバスに収まるか確認（満たさなければ描画しない）
pub fn ensure_complete(available: usize, required: usize) -> Result<()> {
    if required == 0 || available < required {
        return Err(RetroAlbumError::AlbumIncomplete {
            done: available,
            required,
        });
    }
    if !AlbumLayout::for_items(required).is_drawable() {
        return Err(RetroAlbumError::AlbumRender(format!(
            "{}枚はキャンバスに収まりません",
            required
        )));
    }
    Ok(())
}

/// 1枚デコード
pub fn decode_photo(decade: &Decade, image: &GeneratedImage) -> Result<DecodedPhoto> {
    let decoded = image::load_from_memory(&image.data)
        .map_err(|e| RetroAlbumError::ImageLoad(format!("{}: {}", decade, e)))?;

    Ok(DecodedPhoto {
        decade: decade.clone(),
        width: decoded.width(),
        height: decoded.height(),
        image: Arc::new(decoded),
    })
}

/// 描画計画を作る（回転角はここで一度だけ決める）
pub fn plan_album(photos: &[DecodedPhoto], seed: Option<u64>) -> AlbumPlan {
    let layout = AlbumLayout::for_items(photos.len());
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let cards = photos
        .iter()
        .enumerate()
        .map(|(index, photo)| {
            let rotation = rng.random_range(-MAX_ROTATION_RAD..=MAX_ROTATION_RAD);
            let placement = layout.place_card(index, rotation);
            let photo_rect = letterbox(
                photo.width as f32,
                photo.height as f32,
                placement.geometry.photo_frame,
            );
            PlannedCard {
                decade: photo.decade.clone(),
                placement,
                photo: photo_rect,
            }
        })
        .collect();

    AlbumPlan { layout, cards }
}

/// SVG文書を組み立てる
///
/// `photo_hrefs` は `plan.cards` と同じ並びの画像参照（Data URL）。件数が合わなければエラー。
pub fn build_svg(plan: &AlbumPlan, photo_hrefs: &[String], options: &AlbumOptions) -> Result<String> {
    if photo_hrefs.len() != plan.cards.len() {
        return Err(RetroAlbumError::AlbumRender(format!(
            "画像参照の数がカード数と一致しません: {}/{}",
            photo_hrefs.len(),
            plan.cards.len()
        )));
    }

    let layout = &plan.layout;
    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = layout.width,
        h = layout.height
    );
    svg += &format!(
        r##"<defs><filter id="card-shadow" x="-25%" y="-25%" width="150%" height="150%"><feDropShadow dx="{dx}" dy="{dy}" stdDeviation="{sd}" flood-color="#000000" flood-opacity="{op}"/></filter></defs>"##,
        dx = SHADOW_OFFSET_X_PX,
        dy = SHADOW_OFFSET_Y_PX,
        sd = SHADOW_BLUR_PX / 2.0,
        op = SHADOW_OPACITY
    );
    svg += &format!(
        r#"<rect x="0" y="0" width="{}" height="{}" fill="{}"/>"#,
        layout.width, layout.height, BACKGROUND_COLOR
    );

    svg += &format!(
        r#"<text x="{x}" y="{y}" font-family="{font}" font-size="{size}" font-weight="bold" fill="{ink}" text-anchor="middle">{text}</text>"#,
        x = layout.width / 2.0,
        y = TITLE_Y_PX,
        font = TITLE_FONT,
        size = TITLE_FONT_PX,
        ink = INK_COLOR,
        text = escape_xml(&options.title)
    );
    if !options.subtitle.is_empty() {
        svg += &format!(
            r#"<text x="{x}" y="{y}" font-family="{font}" font-size="{size}" fill="{ink}" text-anchor="middle">{text}</text>"#,
            x = layout.width / 2.0,
            y = SUBTITLE_Y_PX,
            font = TITLE_FONT,
            size = SUBTITLE_FONT_PX,
            ink = INK_COLOR,
            text = escape_xml(&options.subtitle)
        );
    }

    for (card, href) in plan.draw_order().zip(photo_hrefs.iter().rev()) {
        svg += &card_svg(card, href);
    }

    svg.push_str("</svg>");
    Ok(svg)
}

/// カード1枚分（影つき台紙・写真枠・写真・キャプション）
fn card_svg(card: &PlannedCard, href: &str) -> String {
    let geometry = &card.placement.geometry;
    let outline = geometry.outline();
    let frame = geometry.photo_frame;

    [
        format!(
            r#"<g class="card" data-decade="{decade}" transform="{transform}">"#,
            decade = escape_xml(card.decade.label()),
            transform = card.placement.transform.to_svg()
        ),
        format!(
            r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}" filter="url(#card-shadow)"/>"#,
            outline.x, outline.y, outline.width, outline.height, CARD_COLOR
        ),
        format!(
            r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}"/>"#,
            frame.x, frame.y, frame.width, frame.height, PHOTO_BACKDROP_COLOR
        ),
        format!(
            r#"<image x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" preserveAspectRatio="none" xlink:href="{}"/>"#,
            card.photo.x, card.photo.y, card.photo.width, card.photo.height, href
        ),
        format!(
            r#"<text x="0" y="{:.2}" font-family="{}" font-size="{:.2}" fill="{}" text-anchor="middle" dominant-baseline="middle">{}</text>"#,
            geometry.caption_y,
            CAPTION_FONT,
            geometry.caption_font_px,
            INK_COLOR,
            escape_xml(card.decade.label())
        ),
        String::from("</g>"),
    ]
    .concat()
}

/// 写真をカード枠の解像度に縮小してPNGのData URLにする
fn photo_href(photo: &DecodedPhoto, card: &PlannedCard) -> Result<String> {
    let target_w = card.photo.width.ceil().max(1.0) as u32;
    let target_h = card.photo.height.ceil().max(1.0) as u32;
    let resized = if photo.width > target_w || photo.height > target_h {
        photo.image.resize(target_w, target_h, FilterType::Triangle)
    } else {
        (*photo.image).clone()
    };

    let mut buf = Vec::new();
    resized
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| RetroAlbumError::ImageEncode(format!("{}: {}", photo.decade, e)))?;
    Ok(to_data_url("image/png", &buf))
}

fn font_database() -> Arc<usvg::fontdb::Database> {
    static FONTS: OnceLock<Arc<usvg::fontdb::Database>> = OnceLock::new();
    FONTS
        .get_or_init(|| {
            let mut db = usvg::fontdb::Database::new();
            db.load_system_fonts();
            tracing::debug!(faces = db.len(), "system fonts loaded");
            Arc::new(db)
        })
        .clone()
}

/// SVGをRGBA画像にラスタライズ
pub fn rasterize(svg: &str, width: u32, height: u32) -> Result<image::RgbaImage> {
    let mut options = usvg::Options::default();
    options.fontdb = font_database();

    let tree = usvg::Tree::from_str(svg, &options)
        .map_err(|e| RetroAlbumError::AlbumRender(format!("SVG解析エラー: {}", e)))?;

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| RetroAlbumError::AlbumRender(format!("キャンバスを確保できません: {}x{}", width, height)))?;
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap.as_mut());

    // 背景は不透明（premultiplied と straight が一致する）
    image::RgbaImage::from_raw(width, height, pixmap.take())
        .ok_or_else(|| RetroAlbumError::AlbumRender("ピクセルバッファのサイズが一致しません".into()))
}

/// JPEGにエンコード
pub fn encode_jpeg(image: &image::RgbaImage, quality: u8) -> Result<Vec<u8>> {
    let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality)
        .encode_image(&rgb)
        .map_err(|e| RetroAlbumError::ImageEncode(format!("JPEGエンコードエラー: {}", e)))?;
    Ok(buf)
}

/// デコード済み写真からアルバムを描画（同期版）
pub fn render_album(photos: &[DecodedPhoto], options: &AlbumOptions) -> Result<Vec<u8>> {
    let plan = plan_album(photos, options.seed);

    let hrefs = photos
        .iter()
        .zip(&plan.cards)
        .map(|(photo, card)| photo_href(photo, card))
        .collect::<Result<Vec<_>>>()?;

    let svg = build_svg(&plan, &hrefs, options)?;
    let width = plan.layout.width as u32;
    let height = plan.layout.height as u32;

    let raster = rasterize(&svg, width, height)?;
    let jpeg = encode_jpeg(&raster, options.jpeg_quality)?;
    tracing::info!(cards = plan.cards.len(), bytes = jpeg.len(), "album rendered");
    Ok(jpeg)
}

/// アルバムを合成する
///
/// `required` 枚そろっていなければ描画せずに `AlbumIncomplete` を返す。
/// 入力はすべて並行にデコードし、1枚でも失敗すれば全体を失敗にする。
pub async fn compose_album(
    items: &[(Decade, GeneratedImage)],
    required: usize,
    options: &AlbumOptions,
) -> Result<Vec<u8>> {
    ensure_complete(items.len(), required)?;

    let decodes = items.iter().cloned().map(|(decade, image)| {
        tokio::task::spawn_blocking(move || decode_photo(&decade, &image))
    });

    let mut photos = Vec::with_capacity(items.len());
    for joined in futures::future::join_all(decodes).await {
        let photo = joined
            .map_err(|e| RetroAlbumError::AlbumRender(format!("デコードタスクエラー: {}", e)))??;
        photos.push(photo);
    }

    let options = options.clone();
    tokio::task::spawn_blocking(move || render_album(&photos, &options))
        .await
        .map_err(|e| RetroAlbumError::AlbumRender(format!("描画タスクエラー: {}", e)))?
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
