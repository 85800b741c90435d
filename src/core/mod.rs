// Core modules implementing layout decoding, column mapping, and error modeling.
pub mod binary;
pub mod column;
pub mod error;
pub mod format;
pub mod meta;
pub mod partition;
pub mod table;
pub mod txn;
pub mod types;
pub mod validate;
pub mod view;
