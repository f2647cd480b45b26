use thiserror::Error;

/// Looks up the human readable label of an enum variant in its label table
pub fn label_of<T: PartialEq>(table: &[(T, &'static str)], value: &T) -> &'static str {
    table
        .iter()
        .find(|(variant, _)| variant == value)
        .map(|(_, label)| *label)
        .unwrap_or("")
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("{code} is not a valid {kind} code")]
pub struct InvalidCodeError {
    pub kind: &'static str,
    pub code: i16,
}
