//! Feature transform stages.
//!
//! Every stage has two states: an unfitted configuration implementing
//! [`Transformer`], and the fitted stage implementing [`FittedTransformer`]
//! returned by `fit`. Fitted stages are immutable and may be shared across
//! threads.
//!
//! ## Stages
//! - [`ColumnCopy`]: duplicate fields under new names
//! - [`OneHotEncoder`]: categorical strings to indicator vectors
//! - [`ColumnConcatenator`]: numeric and vector fields to one feature vector
//!
//! # Example
//! ```
//! use taxi_fares::dataset::{Field, Record, Schema};
//! use taxi_fares::preprocessing::{FittedTransformer, OneHotEncoder, Transformer};
//!
//! let schema = Schema::new(vec![Field::categorical("payment_type")]).unwrap();
//! let records = vec![
//!     Record::new().with("payment_type", "CRD"),
//!     Record::new().with("payment_type", "CSH"),
//! ];
//!
//! let encoder = OneHotEncoder::new(["payment_type"]).fit(&schema, &records).unwrap();
//! let encoded = encoder.apply(Record::new().with("payment_type", "CSH")).unwrap();
//! assert_eq!(encoded.vector("payment_type").unwrap(), &[0.0, 1.0]);
//! ```

pub mod concat;
pub mod copy;
pub mod encoding;
pub mod stage;
pub mod traits;

pub use concat::{ColumnConcatenator, ColumnConcatenatorParams, ConcatSource, FittedColumnConcatenator};
pub use copy::{ColumnCopy, ColumnCopyParams, CopyRule, FittedColumnCopy};
pub use encoding::{CategoricalVocabulary, FittedOneHotEncoder, OneHotEncoder, OneHotEncoderParams};
pub use stage::{FittedStage, Stage, StageKind, StageParams};
pub use traits::{FittedTransformer, Transformer};
