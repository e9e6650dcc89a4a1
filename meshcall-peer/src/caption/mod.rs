mod channel;
mod filter;
mod prediction;

pub use channel::CaptionChannel;
pub use filter::{AcceptedCaption, CaptionFilter};
pub use prediction::{
    FACE_VALUES, FRAME_LEN, HAND_VALUES, Landmark, LandmarkFrame, LandmarkThrottle, Prediction,
};
