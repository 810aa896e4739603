//! 数据模型模块

pub mod notification;

pub use notification::*;
