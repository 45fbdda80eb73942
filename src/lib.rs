//! Oracle OCI marshaling layer for Rust.
//!
//! A marshaling layer between a dynamically-typed host value model and an
//! OCI-style native database client interface: dynamic parameters become
//! typed bind buffers, native result buffers become dynamic values —
//! including result sets of unknown row count and RETURNING INTO output of
//! unknown cardinality.
//!
//! The native interface itself is the [`oci::OciApi`] trait; session
//! establishment is the responsibility of whoever constructs the
//! implementor. [`oci::fake::FakeOci`] is a scriptable in-memory
//! implementation for tests.
//!
//! # Example
//!
//! ```no_run
//! use oracle_oci_rs::{Connection, Result, Table};
//! use oracle_oci_rs::oci::fake::FakeOci;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let mut conn = Connection::new(FakeOci::new());
//!
//!     let mut params = Table::new();
//!     params.set("name", "Bob");
//!     let result = conn
//!         .execute(
//!             "INSERT INTO t(name) VALUES (:name) RETURNING id INTO :id",
//!             Some(&params),
//!         )
//!         .await?;
//!
//!     if let Some(output) = result.output_binds {
//!         println!("generated keys: {:?}", output.get_str("id"));
//!     }
//!     conn.close();
//!     Ok(())
//! }
//! ```

pub mod connection;
pub mod error;
pub mod marshal;
pub mod oci;
pub mod value;

// Re-export main types
pub use connection::{Connection, ExecuteResult};
pub use error::{Error, Result};
pub use oci::{OciApi, OciNumber};
pub use value::{Key, Table, Value};
