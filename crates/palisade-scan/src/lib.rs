//! # palisade-scan
//!
//! The bytecode capability scanner for the PALISADE sandbox verifier:
//! a structural class-file parse plus a recursive-descent walk that
//! derives every capability a class requests — type references, field
//! access, method and constructor invocation — from raw class bytes.
//!
//! Scanning is a pure function of the bytes: no linking, no evaluation,
//! no shared state between classes. Dynamic-invocation sites that cannot
//! be resolved statically fail closed.

pub mod classfile;
pub mod descriptor;
mod reader;
pub mod scan;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

pub use scan::{class_name_of, scan_batch, scan_class};
