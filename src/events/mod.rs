pub use self::normalizer::{NormalizedEvent, normalize};

mod normalizer;
