mod registry;

pub use registry::DeduplicationRegistry;
