// Controller configuration
pub mod config;

// Tag records and the tag database
pub mod tag;

// Hardware descriptors and layout templates
pub mod hwtype;

// Named variables with change tracking
pub mod vars;

// JSON path extraction, template substitution, draw-element streams
pub mod template;

// Rasterizer and image codec collaborators
pub mod render;

// Outbound transport to tags
pub mod transport;

// Content store
pub mod storage;

// Wall clock
pub mod clock;

// Day and month names
pub mod locale;

// HTTP fetches for content sources
pub mod http;

// Content modes and renderers
pub mod content;

// Per-tag dispatch to renderers
pub mod dispatch;

// Scheduling cycle and variable invalidation
pub mod scheduler;
