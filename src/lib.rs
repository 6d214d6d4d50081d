//! Montage is a declarative video composition library.
//!
//! A [`Timeline`] describes clips laid out on a canvas (or joined end to end) plus text,
//! image, color and subtitle overlays. Timelines are turned into output files in one of
//! three ways, picked by [`plan`]:
//!
//! - [`compile`] a filter graph for `ffmpeg`
//! - stream raw RGBA frames through [`run_pixel_pipeline`] when only per-pixel filters apply
//! - copy a single untouched source
//!
//! [`render`] runs the chosen strategy.
#![forbid(unsafe_code)]

pub(crate) mod animation;
pub(crate) mod engine;
pub(crate) mod foundation;
pub(crate) mod graph;
pub(crate) mod pixel;
pub(crate) mod timeline;

pub use crate::foundation::core::{Coord, Size};
pub use crate::foundation::error::{MontageError, MontageResult};

pub use crate::animation::linear::{fade_alpha, linear, sample_linear};
pub use crate::timeline::builder::TimelineBuilder;
pub use crate::timeline::concat::{ConcatSource, concatenate};
pub use crate::timeline::model::{
    AnimationParams, Animations, AudioInfo, Clip, ColorFilter, Composite, CompositeItem,
    Concatenation, CustomFilter, MediaSource, Placement, PositionAnim, RotationAnim, ScaleAnim,
    Timeline, Trim,
};
pub use crate::timeline::overlay::{
    Alignment, Border, ColorOverlay, ImageOverlay, Overlay, OverlayKind, Shadow,
    SubtitleFormat, SubtitleOverlay, TextBox, TextOverlay,
};

pub use crate::graph::compiler::{CompileOpts, SubtitleLayering, compile};
pub use crate::graph::node::{AUDIO_OUT, CompiledGraph, Filter, GraphInput, NodeDecl, VIDEO_OUT};

pub use crate::pixel::filters::{PixelTransform, apply_builtin};
pub use crate::pixel::pipeline::{
    PipelineStats, PixelPipelineOpts, chunk_bounds, run_pixel_pipeline,
};

pub use crate::engine::ffmpeg::{
    AudioSource, EncodeSettings, EncoderCaps, decoder_args, encoder_args, graph_args,
    is_ffmpeg_on_path, map_preset, passthrough_args, run_ffmpeg,
};
pub use crate::engine::probe::{MediaInfo, probe};
pub use crate::engine::strategy::{RenderOpts, RenderReport, RenderStrategy, plan, render};
