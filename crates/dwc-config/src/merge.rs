//! Deep-merge a user-supplied TOML document over the packaged default
//! (§6: "Optional TOML configuration file deep-merged over a packaged
//! default").

use toml::Value;

/// Recursively merge `overlay` onto `base`, in place. Tables are merged
/// key-by-key; any other value in `overlay` replaces the corresponding
/// value in `base` outright (arrays are not concatenated — a user-supplied
/// `pipeline.steps` replaces the default list rather than appending to it).
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Table(base_table), Value::Table(overlay_table)) => {
            for (key, overlay_value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => {
                        base_table.insert(key, overlay_value);
                    }
                }
            }
        }
        (base_slot, overlay_value) => {
            *base_slot = overlay_value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_scalar_replaces_base_scalar() {
        let mut base: Value = toml::from_str("a = 1\nb = 2").unwrap();
        let overlay: Value = toml::from_str("a = 9").unwrap();
        deep_merge(&mut base, overlay);
        assert_eq!(base.get("a").unwrap().as_integer(), Some(9));
        assert_eq!(base.get("b").unwrap().as_integer(), Some(2));
    }

    #[test]
    fn overlay_merges_nested_tables() {
        let mut base: Value = toml::from_str(
            "[qc]\nphash_threshold = 2\nlow_confidence_flag = 0.5",
        )
        .unwrap();
        let overlay: Value = toml::from_str("[qc]\nphash_threshold = 5").unwrap();
        deep_merge(&mut base, overlay);
        let qc = base.get("qc").unwrap();
        assert_eq!(qc.get("phash_threshold").unwrap().as_integer(), Some(5));
        assert_eq!(
            qc.get("low_confidence_flag").unwrap().as_float(),
            Some(0.5)
        );
    }

    #[test]
    fn overlay_array_replaces_rather_than_appends() {
        let mut base: Value = toml::from_str("steps = [\"a\", \"b\"]").unwrap();
        let overlay: Value = toml::from_str("steps = [\"c\"]").unwrap();
        deep_merge(&mut base, overlay);
        let steps = base.get("steps").unwrap().as_array().unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].as_str(), Some("c"));
    }
}
