use percent_encoding::percent_decode_str;

pub const RAW_PREFIX: &str = "raw/";
pub const PROCESSED_PREFIX: &str = "processed/";
pub const RAW_SUFFIX: &str = ".gz";
pub const PROCESSED_SUFFIX: &str = "json";

/// Reverses the form-style encoding S3 applies to keys in event
/// notifications: `+` becomes a space, then `%XX` escapes are decoded.
/// Byte sequences that are not valid UTF-8 are replaced rather than rejected.
pub fn decode_object_key(key: &str) -> String {
    let spaced = key.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

/// Maps source keys in the raw namespace onto the processed namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMapping {
    pub raw_prefix: String,
    pub processed_prefix: String,
}

impl Default for KeyMapping {
    fn default() -> Self {
        Self {
            raw_prefix: RAW_PREFIX.to_string(),
            processed_prefix: PROCESSED_PREFIX.to_string(),
        }
    }
}

impl KeyMapping {
    pub fn new(raw_prefix: impl Into<String>, processed_prefix: impl Into<String>) -> Self {
        Self {
            raw_prefix: raw_prefix.into(),
            processed_prefix: processed_prefix.into(),
        }
    }

    /// Partition segments after the raw prefix are carried over untouched.
    /// Keys outside the raw namespace are nested whole under the processed
    /// prefix. A trailing `.gz` is replaced by `json` with no separating dot.
    pub fn destination_key(&self, source_key: &str) -> String {
        let mut destination = match source_key.strip_prefix(self.raw_prefix.as_str()) {
            Some(rest) => format!("{}{rest}", self.processed_prefix),
            None => format!("{}{source_key}", self.processed_prefix),
        };

        if destination.ends_with(RAW_SUFFIX) {
            destination.truncate(destination.len() - RAW_SUFFIX.len());
            destination.push_str(PROCESSED_SUFFIX);
        }

        destination
    }
}

pub fn processed_object_key(source_key: &str) -> String {
    KeyMapping::default().destination_key(source_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_raw_partitioned_key_into_processed_namespace() {
        assert_eq!(
            processed_object_key("raw/year=2025/month=11/day=26/file.gz"),
            "processed/year=2025/month=11/day=26/filejson"
        );
    }

    #[test]
    fn prefixes_keys_outside_raw_namespace() {
        assert_eq!(
            processed_object_key("other/path/data.gz"),
            "processed/other/path/datajson"
        );
    }

    #[test]
    fn keeps_extension_when_not_gzip() {
        assert_eq!(
            processed_object_key("raw/year=2025/events.ndjson"),
            "processed/year=2025/events.ndjson"
        );
        assert_eq!(processed_object_key("loose.txt"), "processed/loose.txt");
    }

    #[test]
    fn raw_prefix_must_match_at_start() {
        assert_eq!(
            processed_object_key("archive/raw/file.gz"),
            "processed/archive/raw/filejson"
        );
        assert_eq!(processed_object_key("rawfile.gz"), "processed/rawfilejson");
    }

    #[test]
    fn bare_gz_suffix_collapses_to_json() {
        assert_eq!(processed_object_key("raw/.gz"), "processed/json");
    }

    #[test]
    fn custom_prefixes_follow_same_rules() {
        let mapping = KeyMapping::new("landing/", "curated/");
        assert_eq!(
            mapping.destination_key("landing/day=01/part-0.gz"),
            "curated/day=01/part-0json"
        );
        assert_eq!(
            mapping.destination_key("raw/day=01/part-0.gz"),
            "curated/raw/day=01/part-0json"
        );
    }

    #[test]
    fn decodes_percent_escapes_and_plus_as_space() {
        assert_eq!(
            decode_object_key("raw/year%3D2025/month%3D11/my+file%2B1.gz"),
            "raw/year=2025/month=11/my file+1.gz"
        );
    }

    #[test]
    fn plain_keys_decode_unchanged() {
        assert_eq!(
            decode_object_key("raw/year=2025/file.gz"),
            "raw/year=2025/file.gz"
        );
    }

    #[test]
    fn invalid_utf8_escapes_are_replaced() {
        assert_eq!(decode_object_key("raw/%FF.gz"), "raw/\u{FFFD}.gz");
    }
}
