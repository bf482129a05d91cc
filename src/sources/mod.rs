//! Frame source implementations

pub mod directory;

pub use directory::DirectorySource;
