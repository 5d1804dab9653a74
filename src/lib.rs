//! memoreel builds short vertical memorial videos.
//!
//! One or two portrait photos are cut out, placed on a 720x1280 canvas by a geometric
//! [`LayoutEngine`] and composited over a scene background into a start frame. Each start frame
//! is animated by an image-to-video service ([`VideoGenerator`]); the resulting clips are
//! cross-dissolved, followed by a rendered title card, and finished by the [`OverlayPipeline`]
//! (ambient background, watermarks, music) through `ffmpeg`.
//!
//! - [`Orchestrator::run`] drives a whole request.
//! - [`CompositeRenderer`], [`TitleCardGenerator`] and [`OverlayPipeline`] can be used alone.
#![forbid(unsafe_code)]

mod config;
mod foundation;

pub(crate) mod assemble;
pub(crate) mod cutout;
pub(crate) mod effects;
pub(crate) mod generate;
pub(crate) mod layout;
pub(crate) mod media;
pub(crate) mod orchestrate;
pub(crate) mod raster;
pub(crate) mod render;
pub(crate) mod title;

pub use crate::config::{CutoutConfig, ReelConfig};
pub use crate::foundation::bounded::{Bounded, LoopStatus, iterate_bounded};
pub use crate::foundation::core::{Canvas, Fps, PixelRect, Rgba8};
pub use crate::foundation::error::{ReelError, ReelResult, ServiceStatus, Stage};
pub use crate::foundation::naming::timestamped_name;

pub use crate::raster::blur::blur_rgba8_premul;
pub use crate::raster::decode::{cover_fit, load_rgba};
pub use crate::raster::frame::FrameRGBA;

pub use crate::cutout::matte::{Cutout, alpha_bbox, refine_matte, visible_bbox};
pub use crate::cutout::provider::{
    AlphaPassthrough, BestOfCutout, CommandCutoutProvider, CutoutProvider,
};

pub use crate::layout::engine::{
    Constraint, LayoutDiagnostic, LayoutEngine, LayoutOutcome, LayoutOverrides, LayoutParams,
};
pub use crate::layout::framing::{FogSpec, FramingMode, FramingProfile, FramingSpec, FramingTable};
pub use crate::layout::geometry::{Footprint, Placement, SafeArea};
pub use crate::layout::metrics::{LayoutMetrics, PersonMetrics};

pub use crate::render::compositor::{CompositeParams, CompositeRenderer, StartFrame, apply_fog};
pub use crate::render::debug::annotate;

pub use crate::media::command::{EncodeProfile, FfmpegCommand, Input, InputKind};
pub use crate::media::graph::{Filter, FilterChain, FilterGraph, Pad};
pub use crate::media::runner::{
    FfmpegRunner, MediaInfo, MediaRunner, ensure_parent_dir, is_ffmpeg_on_path, parse_probe_json,
};

pub use crate::effects::ambient::AmbientBackground;
pub use crate::effects::crossfade::{
    chained_duration, crossfade_command, crossfade_graph, crossfade_offset,
};
pub use crate::effects::watermark::{
    CornerWatermark, FullFrameWatermark, GridCell, GridLayout, WatermarkConfig, WatermarkMode,
};

pub use crate::title::fit::{
    FittedLine, FittedText, TextExtent, TextMeasure, TextStyle, fit_single_line, fit_text_in_box,
    wrap_words,
};
pub use crate::title::fonts::{FontConfig, FontFace, FontSet, ParleyText, TextBrush};
pub use crate::title::generator::TitleCardGenerator;
pub use crate::title::paint::paint_card;
pub use crate::title::plan::{
    CardPlan, DecorationSlot, MemorialFlow, MemorialTitle, PlacedLine, TitleParams, TitleSpec,
    plan_memorial_card, plan_plain_title,
};

pub use crate::assemble::job::{ClipRef, RenderJob};
pub use crate::assemble::overlay::{
    AssemblyParams, AssemblyReport, OverlayPipeline, StageOutcome, StageRecord,
    concat_list_entry, write_concat_list,
};
pub use crate::assemble::stitch::SegmentStitcher;

pub use crate::generate::payload::{EncodedFrame, PayloadPolicy, data_uri, encode_start_frame};
pub use crate::generate::poll::{PollClock, PollPolicy, SystemClock, await_task};
pub use crate::generate::provider::{
    GenerationRequest, PollError, TaskHandle, TaskStatus, VideoGenerator,
};
pub use crate::generate::runway::{
    RunwayClient, RunwayConfig, parse_task_status, payload_variants, task_id,
};

pub use crate::orchestrate::locks::{RenderLease, RenderLocks};
pub use crate::orchestrate::orchestrator::{
    Orchestrator, OrchestratorSettings, PreparedFrame, SceneFailure, SceneRequest, VideoOutcome,
    VideoRequest,
};
pub use crate::orchestrate::workspace::{
    CleanupReport, IMAGE_EXTENSIONS, RetentionPolicy, VIDEO_EXTENSIONS, Workspace,
    cleanup_artifacts, keep_last_n,
};
