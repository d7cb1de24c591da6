mod file_type;
mod walk;

pub use file_type::FileType;
pub use walk::{
    parent_folder, CancelToken, CrawlAborted, Crawler, FileDescriptor, RESERVED_DIR_PREFIXES,
};
