//! Standard node library
//!
//! One small node per classified role so flows have real material to wire
//! together: text input, template rendering, JSON transforms, HTTP fetch,
//! buffered memory, conditional routing, output collection, and logging.

mod debug;
mod http;
mod input;
mod memory;
mod output;
mod router;
mod template;
mod time;
mod transform;

pub use debug::DebugNode;
pub use http::HttpRequestNode;
pub use input::TextInputNode;
pub use memory::BufferMemoryNode;
pub use output::CollectOutputNode;
pub use router::RouterNode;
pub use template::TemplateNode;
pub use time::DelayNode;
pub use transform::{JsonParseNode, JsonStringifyNode};

use loomruntime::NodeRegistry;
use std::sync::Arc;

/// Register all standard nodes with a registry
pub fn register_all(registry: &mut NodeRegistry) {
    registry.register(Arc::new(input::TextInputNodeFactory));
    registry.register(Arc::new(template::TemplateNodeFactory));
    registry.register(Arc::new(transform::JsonParseNodeFactory));
    registry.register(Arc::new(transform::JsonStringifyNodeFactory));
    registry.register(Arc::new(http::HttpRequestNodeFactory));
    registry.register(Arc::new(memory::BufferMemoryNodeFactory));
    registry.register(Arc::new(router::RouterNodeFactory));
    registry.register(Arc::new(output::CollectOutputNodeFactory));
    registry.register(Arc::new(debug::DebugNodeFactory));
    registry.register(Arc::new(time::DelayNodeFactory));
}
