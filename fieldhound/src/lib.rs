pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    expand_path, load_capture_file, locate_in_document, offline_mapping, parse_target_value,
    write_output,
};
