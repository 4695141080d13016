//! Collaborator interfaces (§6): narrow, testable async traits for the
//! speech-to-text, LLM enrichment, clip segmentation, and video rendering
//! engines the core consumes but does not implement, plus a concrete
//! ffprobe-backed media probe and deterministic test doubles.

pub mod error;
pub mod ffprobe;
pub mod http_clients;
pub mod stubs;
pub mod traits;

pub use error::{CollabError, CollabResult};
pub use ffprobe::FfprobeProbe;
pub use http_clients::{HttpEnrichmentClient, HttpMediaProbeClient, HttpRenderClient, HttpSegmentationClient, HttpSttClient};
pub use stubs::{StubEnricher, StubMediaProbe, StubRenderer, StubSegmenter, StubSttClient};
pub use traits::{ClipDiscoveryConfig, ClipSegmenter, ContentEnricher, EnrichmentContext, MediaInfo, MediaProbe, SpeechTranscriber, VideoRenderer};
