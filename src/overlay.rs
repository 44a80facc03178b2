//! Frame annotation.
//!
//! Composites the status HUD, hand skeletons, the hand-count line, and the
//! smoothed face boxes onto a frame, in that order.

use chrono::Local;

use crate::hand::{HandDetection, CONNECTIVITY};
use crate::image::{draw, Color, Image, Rect};
use crate::resolution::Resolution;

const HUD_COLOR: Color = Color::WHITE;
const HAND_COLOR: Color = Color::GREEN;
const FACE_COLOR: Color = Color::BLUE;

/// Diameter of the filled circle drawn at each hand landmark.
const MARKER_DIAMETER: u32 = 10;

const LABEL_POS: (i32, i32) = (20, 40);
const TIME_POS: (i32, i32) = (20, 80);
const ADDR_POS: (i32, i32) = (20, 120);
const COUNT_POS: (i32, i32) = (470, 20);

/// Draws detection overlays and status text onto frames.
#[derive(Debug, Clone)]
pub struct Overlay {
    label: String,
    addr: Option<String>,
}

impl Overlay {
    /// Creates an overlay renderer showing `label` as the application name.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            addr: None,
        }
    }

    /// Sets the network address shown in the HUD.
    ///
    /// Typically this is the address the serving shell is reachable under.
    #[inline]
    pub fn addr(self, addr: impl Into<String>) -> Self {
        Self {
            addr: Some(addr.into()),
            ..self
        }
    }

    /// Draws all overlays onto `image` in place.
    ///
    /// `hands` are this frame's hand detections; hands whose landmarks reach
    /// the frame edge are counted but not drawn. `faces` are the *smoothed*
    /// face boxes, drawn as-is.
    pub fn draw(&self, image: &mut Image, hands: &[HandDetection], faces: &[Rect]) {
        self.draw_hud(image);

        let res = image.resolution();
        for hand in hands.iter().filter(|hand| hand.fully_contained(res)) {
            draw_hand(image, hand, res);
        }

        draw::text(
            image,
            COUNT_POS.0,
            COUNT_POS.1,
            &hand_count_label(hands.len()),
        )
        .align_left()
        .color(HUD_COLOR);

        for rect in faces {
            draw::rect(image, *rect).color(FACE_COLOR).stroke_width(2);
            draw::text(image, rect.x() as i32, rect.y() as i32 - 10, "face")
                .align_left()
                .color(FACE_COLOR);
        }
    }

    fn draw_hud(&self, image: &mut Image) {
        draw::text(image, LABEL_POS.0, LABEL_POS.1, &self.label)
            .align_left()
            .color(HUD_COLOR);

        let time = Local::now().format("%H:%M:%S");
        draw::text(image, TIME_POS.0, TIME_POS.1, &format!("time: {time}"))
            .align_left()
            .color(HUD_COLOR);

        if let Some(addr) = &self.addr {
            draw::text(image, ADDR_POS.0, ADDR_POS.1, &format!("ip: {addr}"))
                .align_left()
                .color(HUD_COLOR);
        }
    }
}

fn draw_hand(image: &mut Image, hand: &HandDetection, res: Resolution) {
    for (a, b) in CONNECTIVITY {
        let a = hand.landmark_px(*a, res);
        let b = hand.landmark_px(*b, res);
        draw::line(image, a.x as i32, a.y as i32, b.x as i32, b.y as i32).color(HAND_COLOR);
    }
    for pos in hand.landmarks_px(res) {
        draw::circle(image, pos.x as i32, pos.y as i32, MARKER_DIAMETER)
            .filled()
            .color(HAND_COLOR);
    }
}

/// Status line describing the number of detected hands.
///
/// Counts of two or less are reported normally; anything above two means the
/// detector is seeing things, and the message says as much.
pub fn hand_count_label(count: usize) -> String {
    match count {
        0 => "no hands detected".into(),
        1 => "one hand detected".into(),
        2 => "2 hands detected".into(),
        n => format!("{n} hands??? what???"),
    }
}
