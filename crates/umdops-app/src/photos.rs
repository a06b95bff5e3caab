// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use regex::Regex;
use std::sync::LazyLock;

use crate::{Language, Text};

static DRIVE_OPEN_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https://drive\.google\.com/open\?id=[^\s,]+")
        .expect("drive link pattern compiles")
});

/// Drive "open" links found in free text, with trailing commas trimmed.
pub fn drive_links(text: &str) -> Vec<String> {
    DRIVE_OPEN_LINK
        .find_iter(text)
        .map(|found| found.as_str().to_owned())
        .collect()
}

pub fn drive_file_id(link: &str) -> Option<&str> {
    let id = link.trim_end_matches(',').rsplit('=').next()?;
    (!id.is_empty() && id != link).then_some(id)
}

/// Label for the photos column; empty when a row carries no links.
pub fn photo_indicator(text: &str, language: Language) -> String {
    match drive_links(text).len() {
        0 => String::new(),
        count => Text::ContainsPhotos.fill(language, &[&count]),
    }
}
