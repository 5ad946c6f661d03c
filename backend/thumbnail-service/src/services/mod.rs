pub mod thumbnail;

pub use thumbnail::{ThumbnailProcessor, ThumbnailService};
