//! Council Module - three-stage multi-model deliberation
//!
//! One prompt fans out to every selected model (stage 1), each model reviews
//! the full set of answers (stage 2), and a designated chair synthesizes the
//! final answer (stage 3). Stage N+1 never starts before every stage-N call
//! has settled. Token output from all in-flight calls is multiplexed into a
//! single tagged event stream via `TokenSink`.

pub mod artifact;
pub mod context;
pub mod events;
pub mod history;
pub mod pipeline;
pub mod prompts;
pub mod resolver;
pub mod slug;

pub use context::{choose_context, ContextMode, ResolvedContext};
pub use events::{ChannelSink, CouncilEvent, LogSink, NoopSink, Stage, TokenSink};
pub use history::{HistoryRing, RunSummary};
pub use pipeline::{run_council, CouncilError, RunInputs, StageMap, StageResult};
pub use resolver::{catalog, pick_default_models, resolve_initial_models, ModelInfo};
