pub mod category;
pub mod records;
pub mod symbol;
pub mod timestamp;
pub mod url_shape;

pub use category::{Category, CountryCode, Frequency, MarketCategory, NewsFeed, Sentiment};
pub use records::{IndicatorRecord, InstrumentRecord, NewsRecord, TypedRecord};
pub use symbol::Symbol;
pub use timestamp::UtcDateTime;
pub use url_shape::is_url_shaped;
