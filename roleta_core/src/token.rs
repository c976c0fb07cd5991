use rand::{distributions::Alphanumeric, Rng};

/// Length of generated link tokens. 62^12 possible ids keeps collision odds
/// negligible for a process-lifetime registry; the registry still regenerates
/// on a hit.
pub const TOKEN_LEN: usize = 12;

/// Generate an opaque alphanumeric token to use as a link id.
pub fn new_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}
