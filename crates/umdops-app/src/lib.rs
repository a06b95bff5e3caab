// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod auth;
pub mod chain;
pub mod date_range;
pub mod details;
pub mod error;
pub mod geometry;
pub mod history;
pub mod i18n;
pub mod model;
pub mod page;
pub mod pages;
pub mod photos;
pub mod projection;
pub mod search;
pub mod selection;
pub mod source;
pub mod state;
pub mod stats;

pub use auth::*;
pub use chain::*;
pub use date_range::*;
pub use error::*;
pub use geometry::*;
pub use history::*;
pub use i18n::*;
pub use model::*;
pub use page::*;
pub use photos::*;
pub use projection::*;
pub use selection::*;
pub use source::*;
pub use state::*;
pub use stats::*;
