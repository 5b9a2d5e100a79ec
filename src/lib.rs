#![allow(dead_code)]

mod ir;

pub use ir::*;
