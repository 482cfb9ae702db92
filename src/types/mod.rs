//! # Boundary Types
//!
//! This module provides the plain value type exchanged between application
//! code and views.
//!
//! ## Module Structure
//!
//! - `value`: `Value<'a>` with zero-copy text and JSON interop
//!
//! ## Usage
//!
//! ```ignore
//! use structview::types::Value;
//!
//! let v = Value::object([("age", Value::Int(10)), ("name", Value::text("abc"))]);
//! assert_eq!(v.field("age"), Some(&Value::Int(10)));
//! ```

mod value;

pub use value::Value;
