mod debounce;
mod engine;
mod fence;
mod pipeline;
mod stages;
mod view;


pub use pipeline::{Subscriber, SubscriptionId, TermPipeline, WeakTermPipeline};
pub use view::{PipelineView, ViewCounts, ViewState};

pub use tango_config::ConfigError;
pub use tango_config::pipeline::PipelineConfig;
pub use tango_types::{Snapshot, Term, TermStatus};
