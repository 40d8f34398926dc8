// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use serde::{Deserialize, Serialize};

/// A single episode record of the show catalogue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Show {
    pub show_number: u32,
    pub show_title: String,
    /// Only present once details have been fetched for this show
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_details: Option<ShowDetails>,
}

impl Show {
    pub fn new(show_number: u32, show_title: impl Into<String>) -> Self {
        Self {
            show_number,
            show_title: show_title.into(),
            show_details: None,
        }
    }
}

/// Guests and media file of a show
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ShowDetails {
    #[serde(default)]
    pub guests: Vec<Guest>,
    pub file: MediaFile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Guest {
    pub name: String,
}

/// Location of the downloadable audio for a show
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MediaFile {
    pub url: String,
}

/// Request body for fetching a batch of shows by number
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetByShowNumbersRequest {
    pub show_name: String,
    pub indexes: Vec<u32>,
}
