// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Input rules for credential and profile data.

use std::str::FromStr;

use alloy::primitives::Address;

pub const TITLE_MIN_CHARS: usize = 3;
pub const TITLE_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MAX_CHARS: usize = 500;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("title must be between 3 and 100 characters")]
    TitleLength,

    #[error("description must be 500 characters or less")]
    DescriptionTooLong,

    #[error("invalid email address")]
    InvalidEmail,

    #[error("invalid wallet address: {0}")]
    InvalidAddress(String),

    #[error("full name must not be empty")]
    EmptyName,

    #[error("invalid user type: {0}")]
    InvalidUserType(String),
}

/// Strip angle brackets and surrounding whitespace from free text.
pub fn sanitize_input(input: &str) -> String {
    input
        .chars()
        .filter(|c| !matches!(c, '<' | '>'))
        .collect::<String>()
        .trim()
        .to_string()
}

pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    let len = title.trim().chars().count();
    if (TITLE_MIN_CHARS..=TITLE_MAX_CHARS).contains(&len) {
        Ok(())
    } else {
        Err(ValidationError::TitleLength)
    }
}

pub fn validate_description(description: &str) -> Result<(), ValidationError> {
    if description.chars().count() <= DESCRIPTION_MAX_CHARS {
        Ok(())
    } else {
        Err(ValidationError::DescriptionTooLong)
    }
}

/// `local@domain.tld` with no whitespace and exactly one `@`.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidEmail);
    }

    let (local, domain) = email.split_once('@').ok_or(ValidationError::InvalidEmail)?;
    if local.is_empty() || domain.contains('@') {
        return Err(ValidationError::InvalidEmail);
    }

    let has_inner_dot = domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len());
    if !has_inner_dot {
        return Err(ValidationError::InvalidEmail);
    }

    Ok(())
}

/// Lookup key for email addresses.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Parse a `0x` address. Mixed-case input must carry a valid EIP-55 checksum;
/// all-lowercase or all-uppercase input is accepted as-is.
pub fn parse_wallet_address(address: &str) -> Result<Address, ValidationError> {
    let trimmed = address.trim();
    let hex = trimmed
        .strip_prefix("0x")
        .ok_or_else(|| ValidationError::InvalidAddress(trimmed.to_string()))?;

    let parsed = Address::from_str(trimmed)
        .map_err(|_| ValidationError::InvalidAddress(trimmed.to_string()))?;

    let has_upper = hex.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = hex.chars().any(|c| c.is_ascii_lowercase());
    if has_upper && has_lower {
        Address::parse_checksummed(trimmed, None)
            .map_err(|_| ValidationError::InvalidAddress(format!("{trimmed} (bad checksum)")))?;
    }

    Ok(parsed)
}
