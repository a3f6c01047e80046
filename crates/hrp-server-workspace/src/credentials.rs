// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Generated desktop passwords.

use hrp_common_secret::SecretString;
use rand::rngs::OsRng;
use rand::seq::SliceRandom;

/// Shortest password ever issued; shorter requests are raised to this.
pub const MIN_PASSWORD_LENGTH: usize = 16;

// Visually ambiguous characters (I, O, l, o, 0, 1) are left out.
const UPPERCASE: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";
const LOWERCASE: &[u8] = b"abcdefghijkmnpqrstuvwxyz";
const DIGITS: &[u8] = b"23456789";
const SYMBOLS: &[u8] = b"!@#$%";

/// Generate a password of at least [`MIN_PASSWORD_LENGTH`] characters using
/// the operating system's CSPRNG.
///
/// The result always holds at least one uppercase letter, lowercase letter,
/// digit and symbol, in shuffled positions.
pub fn generate_password(length: usize) -> SecretString {
	let length = length.max(MIN_PASSWORD_LENGTH);
	let mut rng = OsRng;
	let classes = [UPPERCASE, LOWERCASE, DIGITS, SYMBOLS];
	let alphabet: Vec<u8> = classes.concat();

	let mut bytes: Vec<u8> = Vec::with_capacity(length);
	for class in classes {
		bytes.extend(class.choose(&mut rng));
	}
	while bytes.len() < length {
		bytes.extend(alphabet.choose(&mut rng));
	}
	bytes.shuffle(&mut rng);

	SecretString::new(bytes.into_iter().map(char::from).collect())
}
