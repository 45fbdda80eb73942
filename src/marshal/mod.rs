//! The bind/define/fetch marshaling pipeline.

pub mod bind;
pub mod define;
pub mod fetch;

pub use bind::{Bind, BindKind, BindReturn, BindValue};
pub use define::{Define, DefineBuffer, DefineKind};
