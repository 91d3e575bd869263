/// Replace every character outside `[A-Za-z0-9_.-]` with `_`.
///
/// Counts per Unicode scalar value: a character outside the BMP becomes one `_`.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Mints object keys of the form `{millis}_{sanitized filename}`.
///
/// Tokens issued by one minter are strictly increasing, so attachments that
/// share a filename within one submission still get distinct keys.
#[derive(Debug, Default)]
pub struct KeyMinter {
    last_token: Option<i64>,
}

impl KeyMinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mint(&mut self, filename: &str, now_millis: i64) -> String {
        let token = match self.last_token {
            Some(last) if now_millis <= last => last + 1,
            _ => now_millis,
        };
        self.last_token = Some(token);
        format!("{token}_{}", sanitize_filename(filename))
    }

    pub fn mint_now(&mut self, filename: &str) -> String {
        self.mint(filename, chrono::Utc::now().timestamp_millis())
    }
}
