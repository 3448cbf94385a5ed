pub mod history;
pub mod render_cache;
pub mod renderer;
pub mod tools;
pub mod viewport;
