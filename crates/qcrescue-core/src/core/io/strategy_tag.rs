//! Codec for fix strategies embedded in `$comment` text.
//!
//! A strategy is stored as a JSON object (four-space indent, sorted keys) between a literal
//! opening and closing marker, appended to the comment on its own line:
//!
//! ```text
//! user annotation
//! <SCF Fix Strategy>{
//!     "current_method_id": 0,
//!     "methods": [ ... ],
//!     "version": 2.0
//! }</SCF Fix Strategy>
//! ```
//!
//! Each strategy class may appear at most once per comment. Repeated or unbalanced markers are
//! rejected rather than resolved, since there is no way to tell which copy is authoritative.

use crate::core::models::deck::Comment;
use crate::core::models::strategy::FixStrategy;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagMarkers {
    pub open: &'static str,
    pub close: &'static str,
}

pub const SCF_TAG: TagMarkers = TagMarkers {
    open: "<SCF Fix Strategy>",
    close: "</SCF Fix Strategy>",
};

pub const GEOM_TAG: TagMarkers = TagMarkers {
    open: "<Geom Opt Fix Strategy>",
    close: "</Geom Opt Fix Strategy>",
};

#[derive(Debug, Error)]
pub enum StrategyTagError {
    #[error("Malformed '{tag}' region: found {opens} opening and {closes} closing marker(s)")]
    Malformed {
        tag: &'static str,
        opens: usize,
        closes: usize,
    },
    #[error("Invalid '{tag}' record: {source}")]
    InvalidRecord {
        tag: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Splits raw comment text into free text and the strategies embedded in it.
pub fn parse_comment(raw: &str) -> Result<Comment, StrategyTagError> {
    let (text, scf_strategy) = extract(raw, &SCF_TAG)?;
    let (text, geom_strategy) = extract(&text, &GEOM_TAG)?;
    Ok(Comment {
        text,
        scf_strategy,
        geom_strategy,
    })
}

/// Renders a comment back to text, appending each strategy on a new line.
pub fn render_comment(comment: &Comment) -> Result<String, StrategyTagError> {
    let mut out = comment.text.clone();
    if let Some(strategy) = &comment.scf_strategy {
        append_tag(&mut out, &SCF_TAG, strategy)?;
    }
    if let Some(strategy) = &comment.geom_strategy {
        append_tag(&mut out, &GEOM_TAG, strategy)?;
    }
    Ok(out)
}

fn extract<M: DeserializeOwned>(
    raw: &str,
    tag: &TagMarkers,
) -> Result<(String, Option<FixStrategy<M>>), StrategyTagError> {
    let opens = raw.matches(tag.open).count();
    let closes = raw.matches(tag.close).count();
    let malformed = StrategyTagError::Malformed {
        tag: tag.open,
        opens,
        closes,
    };
    match (opens, closes) {
        (0, 0) => Ok((raw.to_string(), None)),
        (1, 1) => {
            let start = raw.find(tag.open).ok_or(malformed)?;
            let body_start = start + tag.open.len();
            let body_len = match raw[body_start..].find(tag.close) {
                Some(len) => len,
                None => {
                    return Err(StrategyTagError::Malformed {
                        tag: tag.open,
                        opens,
                        closes,
                    });
                }
            };
            let body = &raw[body_start..body_start + body_len];
            let strategy = serde_json::from_str(body).map_err(|source| {
                StrategyTagError::InvalidRecord {
                    tag: tag.open,
                    source,
                }
            })?;

            let before = &raw[..start];
            let before = before.strip_suffix('\n').unwrap_or(before);
            let after = &raw[body_start + body_len + tag.close.len()..];
            Ok((format!("{}{}", before, after), Some(strategy)))
        }
        _ => Err(malformed),
    }
}

fn append_tag<M: Serialize>(
    out: &mut String,
    tag: &TagMarkers,
    strategy: &FixStrategy<M>,
) -> Result<(), StrategyTagError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    strategy
        .serialize(&mut serializer)
        .map_err(|source| StrategyTagError::InvalidRecord {
            tag: tag.open,
            source,
        })?;

    out.push('\n');
    out.push_str(tag.open);
    out.push_str(&String::from_utf8_lossy(&buf));
    out.push_str(tag.close);
    Ok(())
}
