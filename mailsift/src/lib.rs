pub mod handlers;
pub mod server;

// Re-export commonly used handler functions for convenience
pub use handlers::{load_domains_from_file, load_domains_from_source, render_report};
pub use server::build_router;
