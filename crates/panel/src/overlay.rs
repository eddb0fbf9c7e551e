use inference::{Detection, DetectionSnapshot};

/// Drawing parameters for detection outlines, built once at startup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayStyle {
    pub border_width: f32,
    pub color: [u8; 4],
    /// Caption position relative to the box's top-left corner.
    pub caption_offset: (f32, f32),
    pub caption_size: (f32, f32),
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            border_width: 4.0,
            color: [255, 0, 0, 255],
            caption_offset: (10.0, 10.0),
            caption_size: (200.0, 20.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Screen-space geometry for one detection outline and its caption.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxOverlay {
    pub rect: ScreenRect,
    pub caption_rect: ScreenRect,
    pub caption: String,
}

impl BoxOverlay {
    pub fn from_detection(
        detection: &Detection,
        screen_width: f32,
        screen_height: f32,
        style: &OverlayStyle,
    ) -> Self {
        let b = &detection.bbox;
        let (x_min, x_max) = (b.xmin * screen_width, b.xmax * screen_width);
        let (y_min, y_max) = (b.ymin * screen_height, b.ymax * screen_height);

        let rect = ScreenRect {
            x: x_min,
            y: y_min,
            width: x_max - x_min,
            height: y_max - y_min,
        };
        let caption_rect = ScreenRect {
            x: x_min + style.caption_offset.0,
            y: y_min + style.caption_offset.1,
            width: style.caption_size.0,
            height: style.caption_size.1,
        };

        Self {
            rect,
            caption_rect,
            caption: format!("{}: {}%", detection.label, (detection.score * 100.0) as u32),
        }
    }
}

/// Outlines for every detection in a snapshot, in emission order.
pub fn overlays(
    snapshot: &DetectionSnapshot,
    screen_width: f32,
    screen_height: f32,
    style: &OverlayStyle,
) -> Vec<BoxOverlay> {
    snapshot
        .detections
        .iter()
        .map(|d| BoxOverlay::from_detection(d, screen_width, screen_height, style))
        .collect()
}
