//! Readers for the two Nanonis file formats.
//!
//! Header keys are lower-cased; table-valued header sections are flattened
//! to `section>column` using the first table row. Well-known channel names
//! are shortened to the nicknames the browser uses (`z`, `I`, `dIdV`, `df`,
//! `V`); other channels keep their recorded name.

pub(crate) mod dat;
pub(crate) mod sxm;

/// Recorded channel name to browser nickname.
const CHANNEL_NICKNAMES: &[(&str, &str)] = &[
    ("Z", "z"),
    ("Z rel", "zrel"),
    ("Current", "I"),
    ("LI Demod 1 X", "dIdV"),
    ("LI Demod 1 Y", "dIdV_Y"),
    ("Frequency Shift", "df"),
    ("Amplitude", "A"),
    ("Excitation", "exc"),
    ("Phase", "phi"),
    ("Bias", "V"),
    ("Bias calc", "V"),
];

/// Nickname for a recorded channel name, or the name itself.
pub fn channel_nickname(name: &str) -> &str {
    CHANNEL_NICKNAMES
        .iter()
        .find(|(recorded, _)| *recorded == name)
        .map(|(_, nickname)| *nickname)
        .unwrap_or(name)
}

/// Picks a channel name not yet in `taken`: the nickname when free,
/// otherwise the recorded name.
fn unique_channel_name(recorded: &str, taken: &[String]) -> String {
    let nickname = channel_nickname(recorded);
    if taken.iter().any(|name| name == nickname) {
        recorded.to_string()
    } else {
        nickname.to_string()
    }
}

/// Splits `Name (unit)` into name and unit.
fn split_unit(column: &str) -> (&str, &str) {
    let column = column.trim();
    match column.rsplit_once(" (") {
        Some((name, rest)) if rest.ends_with(')') => (name.trim(), &rest[..rest.len() - 1]),
        _ => (column, ""),
    }
}
