//! Conversions between A1-style references and 0-based indexes.

/// Converts column letters ("A", "AZ") to a 0-based column index.
pub fn col_to_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    let mut index = 0usize;
    for character in letters.chars() {
        if !character.is_ascii_alphabetic() {
            return None;
        }
        let digit = (character.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        index = index.checked_mul(26)?.checked_add(digit)?;
    }
    Some(index - 1)
}

/// Converts a 1-based row number ("1") to a 0-based row index.
pub fn row_to_index(digits: &str) -> Option<usize> {
    digits.parse::<usize>().ok().filter(|row| *row > 0).map(|row| row - 1)
}

/// Converts a 0-based column index to column letters.
pub fn index_to_col(col: usize) -> String {
    let mut column = col + 1;
    let mut letters = String::new();
    while column > 0 {
        column -= 1;
        letters.insert(0, (b'A' + (column % 26) as u8) as char);
        column /= 26;
    }
    letters
}

/// Converts 0-based (row, col) to an A1-style reference.
pub fn index_to_reference(row: usize, col: usize) -> String {
    format!("{}{}", index_to_col(col), row + 1)
}

/// Converts an A1-style reference to 0-based (row, col).
pub fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let split = reference.find(|character: char| character.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    Some((row_to_index(digits)?, col_to_index(letters)?))
}
