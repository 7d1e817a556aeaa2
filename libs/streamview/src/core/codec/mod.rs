// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Codec types and platform-aware encoder selection.

pub mod encoder;
pub mod encoding_config;
pub mod video_codec;

pub use encoder::{payloader_stage, select_encoder, select_encoder_named, EncoderStage};
pub use encoding_config::EncodingConfig;
pub use video_codec::VideoCodec;
