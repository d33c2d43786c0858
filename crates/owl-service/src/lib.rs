pub mod daemon;
pub mod flush_loop;
pub mod pipeline;
pub mod watcher;
