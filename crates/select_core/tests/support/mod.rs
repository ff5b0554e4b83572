#![allow(dead_code)]

pub mod hosts;
