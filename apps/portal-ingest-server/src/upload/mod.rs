//! File Ingestion
//!
//! Accept, validate and persist a single uploaded file:
//! 1. The validator checks the declared media type and length against the
//!    category's contract, before any byte is written
//! 2. The store writer streams the payload to `{base_dir}/{category}/{uuid}.{ext}`
//!    and removes the file again if anything goes wrong
//! 3. The caller answers with the public `/host/...` url of the stored file

pub mod store_writer;
pub mod types;
pub mod validator;

pub use store_writer::StoreWriter;
pub use types::*;
pub use validator::Validator;
