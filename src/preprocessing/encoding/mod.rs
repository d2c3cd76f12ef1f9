//! Categorical feature encoding.
//!
//! ## OneHotEncoder
//! Converts string categories to indicator vectors.
//!
//! ```ignore
//! // vendor_id: "CMT", "VTS", "CMT"
//! // encoded:   [1,0], [0,1], [1,0]
//! ```
//!
//! Categories not seen during fitting encode to the all-zero vector; the
//! vocabulary is never extended after fitting.

mod one_hot;

pub use one_hot::{CategoricalVocabulary, FittedOneHotEncoder, OneHotEncoder, OneHotEncoderParams};
