//! Testing utilities
//!
//! A synthetic capture facility so the panel can be exercised offline,
//! without camera hardware or a permission prompt.

pub mod synthetic_data;

pub use synthetic_data::{
    synthetic_video_frame, SyntheticCamera, SyntheticMediaDevices, SyntheticStream,
};
