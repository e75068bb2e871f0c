//! Participant input validation utilities

use crate::domain::{ParticipantQuery, MAX_PARTICIPANT_PAGE};
use crate::error::{PoolError, Result};

/// Maximum stored length of any participant field (characters)
pub const MAX_FIELD_LEN: usize = 120;

/// Normalize a free-text participant field
///
/// Runs of CR/LF become a single space, surrounding whitespace is trimmed and
/// the result is truncated to [`MAX_FIELD_LEN`] characters.
pub fn sanitize_field(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len().min(MAX_FIELD_LEN));
    let mut in_break = false;
    for ch in raw.chars() {
        if ch == '\r' || ch == '\n' {
            if !in_break {
                out.push(' ');
                in_break = true;
            }
        } else {
            out.push(ch);
            in_break = false;
        }
    }
    out.trim().chars().take(MAX_FIELD_LEN).collect()
}

/// Sanitized join request fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinFields {
    /// Display name
    pub name: String,
    /// School the participant represents
    pub school: String,
    /// Optional group, `None` when blank
    pub group: Option<String>,
}

/// Sanitize and check the fields of a join request
///
/// Name and school are required after sanitizing; a blank group is stored as
/// absent.
pub fn validate_join(name: &str, school: &str, group: Option<&str>) -> Result<JoinFields> {
    let name = sanitize_field(name);
    let school = sanitize_field(school);
    if name.is_empty() {
        return Err(PoolError::InvalidParticipant {
            reason: "name is required".to_string(),
        });
    }
    if school.is_empty() {
        return Err(PoolError::InvalidParticipant {
            reason: "school is required".to_string(),
        });
    }
    let group = group.map(sanitize_field).filter(|g| !g.is_empty());

    Ok(JoinFields {
        name,
        school,
        group,
    })
}

/// Sanitize the text filters of a participant listing and clamp its page
///
/// Blank filters are dropped; `limit` lands in `1..=MAX_PARTICIPANT_PAGE`.
pub fn normalize_participant_query(query: &ParticipantQuery) -> ParticipantQuery {
    let filter = |raw: &Option<String>| {
        raw.as_deref()
            .map(sanitize_field)
            .filter(|value| !value.is_empty())
    };
    ParticipantQuery {
        q: filter(&query.q),
        school: filter(&query.school),
        order: query.order,
        limit: query.limit.clamp(1, MAX_PARTICIPANT_PAGE),
        offset: query.offset,
    }
}
