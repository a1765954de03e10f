// Licensed under the Open Software License version 3.0
pub mod connection;
pub mod error;
pub mod file;
pub mod section;
pub mod types;
