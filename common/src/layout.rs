//! アルバムレイアウトモジュール
//!
//! px基準のレイアウト定義。キャンバスはA4相当（300dpi）。
//! セル配置・カード寸法・写真のレターボックス計算はすべてここで行い、
//! 描画側は計算済みの値を適用するだけにする。

// ============================================
// px基準レイアウト（Source of Truth）
// ============================================

/// キャンバスサイズ（px）
pub const ALBUM_WIDTH_PX: f32 = 2480.0;
pub const ALBUM_HEIGHT_PX: f32 = 3508.0;

/// 背景色
pub const BACKGROUND_COLOR: &str = "#FDF5E6";

/// タイトル領域
pub const TITLE_TEXT: &str = "Generated with Retro Album";
pub const SUBTITLE_TEXT: &str = "one portrait, six decades";
pub const TITLE_Y_PX: f32 = 185.0;
pub const SUBTITLE_Y_PX: f32 = 260.0;
pub const TITLE_FONT_PX: f32 = 100.0;
pub const SUBTITLE_FONT_PX: f32 = 50.0;

/// グリッド開始位置（タイトル領域の下端）
pub const CONTENT_TOP_PX: f32 = 300.0;

/// グリッド設定
pub const GRID_COLUMNS: usize = 2;
pub const GRID_PADDING_PX: f32 = 100.0;

/// カードはセルの90%に収める
pub const CARD_FILL_RATIO: f32 = 0.9;

/// カードの縦横比（高さ / 幅）
pub const CARD_ASPECT_RATIO: f32 = 1.2;

/// 写真枠の余白（カード幅比）
pub const CARD_MARGIN_RATIO: f32 = 0.05;

/// キャプション文字サイズ（カード幅比）
pub const CAPTION_FONT_RATIO: f32 = 0.085;

/// 回転角の上限（ラジアン、±）
pub const MAX_ROTATION_RAD: f32 = 0.05;

/// 影の設定
pub const SHADOW_OFFSET_X_PX: f32 = 5.0;
pub const SHADOW_OFFSET_Y_PX: f32 = 10.0;
pub const SHADOW_BLUR_PX: f32 = 35.0;
pub const SHADOW_OPACITY: f32 = 0.35;

/// JPEG品質
pub const ALBUM_JPEG_QUALITY: u8 = 90;

// ============================================
// 幾何型
// ============================================

/// 矩形（左上原点）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// `other` を完全に含むか（誤差許容）
    pub fn contains(&self, other: &Rect) -> bool {
        const EPS: f32 = 0.01;
        other.x >= self.x - EPS
            && other.y >= self.y - EPS
            && other.right() <= self.right() + EPS
            && other.bottom() <= self.bottom() + EPS
    }
}

/// カードごとの変換（平行移動 + 回転）
///
/// カード中心を原点とするローカル座標をキャンバス座標へ写す。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardTransform {
    pub translate_x: f32,
    pub translate_y: f32,
    pub rotation_rad: f32,
}

impl CardTransform {
    /// ローカル座標の点をキャンバス座標へ変換
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        let (sin, cos) = self.rotation_rad.sin_cos();
        (
            self.translate_x + x * cos - y * sin,
            self.translate_y + x * sin + y * cos,
        )
    }

    /// SVGのtransform属性値
    pub fn to_svg(&self) -> String {
        format!(
            "translate({:.2} {:.2}) rotate({:.4})",
            self.translate_x,
            self.translate_y,
            self.rotation_rad.to_degrees()
        )
    }
}

/// カード内部の寸法（カード中心原点）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardGeometry {
    pub width: f32,
    pub height: f32,
    /// 写真枠（正方形）
    pub photo_frame: Rect,
    /// キャプションのベースライン中心Y
    pub caption_y: f32,
    pub caption_font_px: f32,
}

impl CardGeometry {
    /// カード外形
    pub fn outline(&self) -> Rect {
        Rect::new(-self.width / 2.0, -self.height / 2.0, self.width, self.height)
    }
}

/// 1枚分の配置結果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardPlacement {
    pub index: usize,
    pub row: usize,
    pub col: usize,
    pub cell: Rect,
    pub geometry: CardGeometry,
    pub transform: CardTransform,
}

// ============================================
// レイアウト設定構造体
// ============================================

/// アルバムレイアウト設定
#[derive(Debug, Clone, PartialEq)]
pub struct AlbumLayout {
    pub width: f32,
    pub height: f32,
    pub content_top: f32,
    pub columns: usize,
    pub rows: usize,
    pub padding: f32,
}

impl AlbumLayout {
    /// 指定枚数を収めるレイアウト（列数固定、行数は切り上げ）
    pub fn for_items(count: usize) -> Self {
        let rows = count.div_ceil(GRID_COLUMNS).max(1);
        Self {
            width: ALBUM_WIDTH_PX,
            height: ALBUM_HEIGHT_PX,
            content_top: CONTENT_TOP_PX,
            columns: GRID_COLUMNS,
            rows,
            padding: GRID_PADDING_PX,
        }
    }

    /// セル総数
    pub fn capacity(&self) -> usize {
        self.rows * self.columns
    }

    /// セルが正の大きさを持つか（件数が多すぎるとパディングだけで埋まる）
    pub fn is_drawable(&self) -> bool {
        self.cell_width() > 0.0 && self.cell_height() > 0.0
    }

    /// グリッド領域の高さ
    pub fn content_height(&self) -> f32 {
        self.height - self.content_top
    }

    pub fn cell_width(&self) -> f32 {
        (self.width - self.padding * (self.columns as f32 + 1.0)) / self.columns as f32
    }

    pub fn cell_height(&self) -> f32 {
        (self.content_height() - self.padding * (self.rows as f32 + 1.0)) / self.rows as f32
    }

    /// 並び順からグリッド位置 (row, col) を求める
    pub fn grid_position(&self, index: usize) -> (usize, usize) {
        (index / self.columns, index % self.columns)
    }

    /// セル矩形
    pub fn cell_rect(&self, index: usize) -> Rect {
        let (row, col) = self.grid_position(index);
        let w = self.cell_width();
        let h = self.cell_height();
        Rect::new(
            self.padding + col as f32 * (w + self.padding),
            self.content_top + self.padding + row as f32 * (h + self.padding),
            w,
            h,
        )
    }

    /// セルの90%に収まる、縦横比固定のカード寸法
    pub fn card_geometry(&self) -> CardGeometry {
        let max_w = self.cell_width() * CARD_FILL_RATIO;
        let max_h = self.cell_height() * CARD_FILL_RATIO;

        let mut width = max_w;
        let mut height = width * CARD_ASPECT_RATIO;
        if height > max_h {
            height = max_h;
            width = height / CARD_ASPECT_RATIO;
        }

        let margin = width * CARD_MARGIN_RATIO;
        let side = width - margin * 2.0;
        let photo_frame = Rect::new(-width / 2.0 + margin, -height / 2.0 + margin, side, side);

        // 写真枠の下端からカード下端までの中央
        let caption_y = (photo_frame.bottom() + height / 2.0) / 2.0;
        let caption_font_px = width * CAPTION_FONT_RATIO;

        CardGeometry {
            width,
            height,
            photo_frame,
            caption_y,
            caption_font_px,
        }
    }

    /// カード配置を計算（回転角は呼び出し側が決める）
    pub fn place_card(&self, index: usize, rotation_rad: f32) -> CardPlacement {
        let (row, col) = self.grid_position(index);
        let cell = self.cell_rect(index);
        let (cx, cy) = cell.center();
        let rotation_rad = rotation_rad.clamp(-MAX_ROTATION_RAD, MAX_ROTATION_RAD);

        CardPlacement {
            index,
            row,
            col,
            cell,
            geometry: self.card_geometry(),
            transform: CardTransform {
                translate_x: cx,
                translate_y: cy,
                rotation_rad,
            },
        }
    }
}

// ============================================
// ヘルパー関数
// ============================================

/// 縦横比を保ったまま枠内に収まる寸法
pub fn fit_within(src_width: f32, src_height: f32, box_width: f32, box_height: f32) -> (f32, f32) {
    if src_width <= 0.0 || src_height <= 0.0 {
        return (0.0, 0.0);
    }
    let scale = (box_width / src_width).min(box_height / src_height);
    (src_width * scale, src_height * scale)
}

/// 枠の中央に縦横比を保って配置（レターボックス）
pub fn letterbox(src_width: f32, src_height: f32, frame: Rect) -> Rect {
    let (w, h) = fit_within(src_width, src_height, frame.width, frame.height);
    Rect::new(
        frame.x + (frame.width - w) / 2.0,
        frame.y + (frame.height - h) / 2.0,
        w,
        h,
    )
}
