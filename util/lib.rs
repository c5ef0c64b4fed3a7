/*!
This crate contains small utilities shared by the spotlight crates.
*/

#![allow(clippy::tabs_in_doc_comments)]

pub mod subscription;
