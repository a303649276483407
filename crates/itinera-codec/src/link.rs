// SPDX-License-Identifier: MIT
// Copyright (c) 2020 Austin Goudge
// Copyright (c) 2026 StarTuz

//! Share links: `<base>?n=<base64url(name)>&i=<encoded itinerary>`.

use crate::codec::{decode, encode};
use crate::Itinerary;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use thiserror::Error;
use url::Url;

/// Longest link we hand out or accept.
pub const MAX_LINK_LEN: usize = 2048;

#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Link is {len} characters long; the limit is {max}")]
    TooLong { len: usize, max: usize },
    #[error("Link is missing the '{0}' parameter")]
    MissingParam(&'static str),
    #[error("Itinerary name is not valid base64 text")]
    BadName,
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedItinerary {
    pub name: String,
    pub itinerary: Itinerary,
}

/// Builds a share link. The length ceiling is not checked here; see
/// [`check_link_len`] or [`share_link`].
///
/// A base that already carries a query keeps it; `n` and `i` are appended.
pub fn link(base: &str, name: &str, itinerary: &Itinerary) -> String {
    let base = base.trim_end_matches(['?', '&']);
    let sep = if base.contains('?') { '&' } else { '?' };
    format!(
        "{}{}n={}&i={}",
        base,
        sep,
        URL_SAFE_NO_PAD.encode(name.as_bytes()),
        encode(itinerary)
    )
}

pub fn check_link_len(link: &str, max: usize) -> Result<(), LinkError> {
    let len = link.chars().count();
    if len > max {
        return Err(LinkError::TooLong { len, max });
    }
    Ok(())
}

/// [`link`] followed by the ceiling check.
pub fn share_link(
    base: &str,
    name: &str,
    itinerary: &Itinerary,
    max: usize,
) -> Result<String, LinkError> {
    let url = link(base, name, itinerary);
    check_link_len(&url, max)?;
    Ok(url)
}

/// Reads a share link back. The itinerary part is decoded fail-soft, so a
/// corrupt token yields an empty itinerary rather than an error.
pub fn parse_link(url: &str, max: usize) -> Result<SharedItinerary, LinkError> {
    check_link_len(url, max)?;
    let parsed = Url::parse(url)?;

    let mut name = None;
    let mut token = None;
    for (key, value) in parsed.query_pairs() {
        match key.as_ref() {
            "n" => name = Some(value.into_owned()),
            "i" => token = Some(value.into_owned()),
            _ => {}
        }
    }

    let name = name.ok_or(LinkError::MissingParam("n"))?;
    let token = token.ok_or(LinkError::MissingParam("i"))?;

    let name_bytes = URL_SAFE_NO_PAD
        .decode(name.trim_end_matches('='))
        .map_err(|_| LinkError::BadName)?;
    let name = String::from_utf8(name_bytes).map_err(|_| LinkError::BadName)?;

    Ok(SharedItinerary {
        name,
        itinerary: decode(&token),
    })
}
