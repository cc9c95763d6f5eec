use crate::math::Point2d;
#[cfg(feature = "debug")]
use serde_json::json;

#[cfg(feature = "debug")]
thread_local!(
    static DEBUG_FRAME: std::cell::RefCell<Vec<serde_json::Value>> = Default::default();
);

#[allow(unused)]
pub fn debug_segment(name: &str, p1: Point2d, p2: Point2d) {
    #[cfg(feature = "debug")]
    DEBUG_FRAME.with(|frame| {
        frame.borrow_mut().push(json!({
            "type": "segment",
            "name": name,
            "p1": [p1.x, p1.y],
            "p2": [p2.x, p2.y],
        }))
    })
}

#[allow(unused)]
pub fn debug_circle(name: &str, centre: Point2d, radius: f64) {
    #[cfg(feature = "debug")]
    DEBUG_FRAME.with(|frame| {
        frame.borrow_mut().push(json!({
            "type": "circle",
            "name": name,
            "centre": [centre.x, centre.y],
            "radius": radius
        }))
    })
}

#[allow(unused)]
pub fn debug_profile(name: &str, arc_length: &[f64], speeds: &[f64]) {
    #[cfg(feature = "debug")]
    DEBUG_FRAME.with(|frame| {
        frame.borrow_mut().push(json!({
            "type": "profile",
            "name": name,
            "s": arc_length,
            "v": speeds,
        }))
    })
}

/// Takes the debugging information recorded on this thread since the last call.
#[cfg(feature = "debug")]
pub fn take_debug_frame() -> serde_json::Value {
    json!(DEBUG_FRAME.with(|frame| frame.take()))
}
