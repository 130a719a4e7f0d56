use crate::face_detector::NormalizedRect;

/// Default margin around the mouth box: crop side = box side × margin.
pub const DEFAULT_MOUTH_MARGIN: f64 = 1.6;

/// Crop region within the source frame, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Pixel crop around a normalized mouth bounding box.
///
/// The box is grown by `margin` around its own center, then shifted (not
/// shrunk) to stay inside the frame where possible. Returns `None` for a
/// degenerate box or one entirely outside the frame.
pub fn mouth_crop(
    frame_width: u32,
    frame_height: u32,
    mouth: &NormalizedRect,
    margin: f64,
) -> Option<CropRegion> {
    if frame_width == 0 || frame_height == 0 || mouth.width <= 0.0 || mouth.height <= 0.0 {
        return None;
    }
    let (fw, fh) = (frame_width as f64, frame_height as f64);

    let center_x = (mouth.x + mouth.width / 2.0) * fw;
    let center_y = (mouth.y + mouth.height / 2.0) * fh;
    if !(0.0..=fw).contains(&center_x) || !(0.0..=fh).contains(&center_y) {
        return None;
    }

    let margin = margin.max(1.0);
    let crop_w = (mouth.width * fw * margin).round().clamp(1.0, fw);
    let crop_h = (mouth.height * fh * margin).round().clamp(1.0, fh);

    // Keep the mouth centered, sliding the window back inside the frame
    let x = (center_x - crop_w / 2.0).round().clamp(0.0, fw - crop_w);
    let y = (center_y - crop_h / 2.0).round().clamp(0.0, fh - crop_h);

    Some(CropRegion {
        x: x as u32,
        y: y as u32,
        width: crop_w as u32,
        height: crop_h as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: f64, y: f64, width: f64, height: f64) -> NormalizedRect {
        NormalizedRect {
            x,
            y,
            width,
            height,
        }
    }

    #[test]
    fn centered_mouth_grows_around_center() {
        // 100x100 box at (250, 300) in a 640x480 frame, margin 2 → 200x200
        let crop = mouth_crop(640, 480, &rect(250.0 / 640.0, 300.0 / 480.0, 100.0 / 640.0, 100.0 / 480.0), 2.0)
            .unwrap();
        assert_eq!(crop.width, 200);
        assert_eq!(crop.height, 200);
        assert_eq!(crop.x, 200); // 300 - 100
        assert_eq!(crop.y, 250); // 350 - 100
    }

    #[test]
    fn crop_slides_inside_frame_edges() {
        // box touching the bottom-right corner
        let crop = mouth_crop(100, 100, &rect(0.8, 0.8, 0.2, 0.2), 2.0).unwrap();
        assert_eq!(crop.width, 40);
        assert_eq!(crop.height, 40);
        assert_eq!(crop.x, 60);
        assert_eq!(crop.y, 60);
    }

    #[test]
    fn oversized_margin_clamps_to_frame() {
        let crop = mouth_crop(100, 50, &rect(0.25, 0.25, 0.5, 0.5), 10.0).unwrap();
        assert_eq!(
            crop,
            CropRegion {
                x: 0,
                y: 0,
                width: 100,
                height: 50
            }
        );
    }

    #[test]
    fn margin_below_one_keeps_box_size() {
        let crop = mouth_crop(100, 100, &rect(0.4, 0.4, 0.2, 0.2), 0.5).unwrap();
        assert_eq!((crop.width, crop.height), (20, 20));
        assert_eq!((crop.x, crop.y), (40, 40));
    }

    #[test]
    fn degenerate_or_offscreen_box() {
        assert!(mouth_crop(100, 100, &rect(0.4, 0.4, 0.0, 0.2), 2.0).is_none());
        assert!(mouth_crop(100, 100, &rect(1.5, 0.4, 0.2, 0.2), 2.0).is_none());
        assert!(mouth_crop(0, 100, &rect(0.4, 0.4, 0.2, 0.2), 2.0).is_none());
    }
}
