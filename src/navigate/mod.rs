//! Navigate module
//!
//! Per-connection working directory handling on top of the shared directory tree.

mod view;

pub use view::NavigationView;
