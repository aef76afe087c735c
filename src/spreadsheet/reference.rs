//! A1-style cell reference conversions. All indexes are 1-based.

/// Converts a column name ("A", "AB") to its 1-based index
pub(crate) fn col_to_index(name: &str) -> Option<usize> {
    if name.is_empty() {
        return None;
    }
    let mut index = 0usize;
    for character in name.chars() {
        if !character.is_ascii_alphabetic() {
            return None;
        }
        let digit = (character.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        index = index.checked_mul(26)?.checked_add(digit)?;
    }
    Some(index)
}

/// Converts a row label ("1", "42") to its 1-based index
pub(crate) fn row_to_index(label: &str) -> Option<usize> {
    label.parse::<usize>().ok().filter(|row| *row > 0)
}

/// Splits an A1 reference into (row, col)
pub(crate) fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let split = reference.find(|character: char| character.is_ascii_digit())?;
    let col = col_to_index(&reference[..split])?;
    let row = row_to_index(&reference[split..])?;
    Some((row, col))
}

/// Converts a 1-based column index to its name
pub fn index_to_col(mut col: usize) -> String {
    let mut name = Vec::<u8>::new();
    while col > 0 {
        let remainder = (col - 1) % 26;
        name.push(b'A' + remainder as u8);
        col = (col - 1) / 26;
    }
    name.reverse();
    String::from_utf8(name).unwrap_or_default()
}

/// Builds an A1 reference from 1-based (row, col)
pub fn index_to_reference(row: usize, col: usize) -> String {
    format!("{}{}", index_to_col(col), row)
}
