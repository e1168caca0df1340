mod collection;

pub use collection::Collection;
