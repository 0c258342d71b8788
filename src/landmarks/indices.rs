//! Face-mesh landmark indices used by the extractors.

// Eye contours, used for the gaze bounding boxes.
pub const LEFT_EYE_CONTOUR: [usize; 16] = [
    33, 7, 163, 144, 145, 153, 154, 155, 133, 173, 157, 158, 159, 160, 161, 246,
];
pub const RIGHT_EYE_CONTOUR: [usize; 16] = [
    362, 382, 381, 380, 374, 373, 390, 249, 263, 466, 388, 387, 386, 385, 384, 398,
];

// Iris refinement points (centre + four ring points).
pub const LEFT_IRIS: [usize; 5] = [468, 469, 470, 471, 472];
pub const RIGHT_IRIS: [usize; 5] = [473, 474, 475, 476, 477];

// EAR points.
pub const LEFT_EYE_TOP_1: usize = 159;
pub const LEFT_EYE_TOP_2: usize = 158;
pub const LEFT_EYE_BOTTOM_1: usize = 145;
pub const LEFT_EYE_BOTTOM_2: usize = 153;
pub const LEFT_EYE_INNER: usize = 133;
pub const LEFT_EYE_OUTER: usize = 33;

pub const RIGHT_EYE_TOP_1: usize = 386;
pub const RIGHT_EYE_TOP_2: usize = 385;
pub const RIGHT_EYE_BOTTOM_1: usize = 374;
pub const RIGHT_EYE_BOTTOM_2: usize = 380;
pub const RIGHT_EYE_INNER: usize = 362;
pub const RIGHT_EYE_OUTER: usize = 263;

// Head pose points.
pub const NOSE_TIP: usize = 1;
pub const LEFT_CHEEK: usize = 234;
pub const RIGHT_CHEEK: usize = 454;
pub const FOREHEAD: usize = 10;
pub const CHIN: usize = 152;
