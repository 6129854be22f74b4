//! `process-pst` — convert a decoded mailbox into an EDRM XML loadfile and
//! a directory of exported files.
//!
//! The crate walks a [`source::MailboxSource`] depth-first, turns every
//! message and attachment into a numbered document with metadata tags,
//! exports each document's content, and writes `edrm-loadfile.xml` last.

pub mod config;
pub mod error;
pub mod export;
pub mod inspect;
pub mod loadfile;
pub mod mapping;
pub mod model;
pub mod run;
pub mod source;
pub mod tree;
