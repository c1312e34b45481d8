//! `${name}` placeholder substitution for batch commands.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_.-]*)\}").expect("placeholder regex is valid")
});

/// Replace `${name}` placeholders with values from `variables`.
///
/// Unknown names are left as written so the device reports them.
pub fn substitute_variables(command: &str, variables: &HashMap<String, String>) -> String {
    PLACEHOLDER
        .replace_all(command, |caps: &Captures<'_>| match variables.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Blank lines and comments (`#` or `//`) are not sent in a batch.
pub fn is_skippable_line(line: &str) -> bool {
    let line = line.trim_start();
    line.trim_end().is_empty() || line.starts_with('#') || line.starts_with("//")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> HashMap<String, String> {
        HashMap::from([
            ("iface".to_string(), "GigabitEthernet0/1".to_string()),
            ("vrf".to_string(), "MGMT".to_string()),
        ])
    }

    #[test]
    fn test_substitute() {
        assert_eq!(
            substitute_variables("show interface ${iface}", &vars()),
            "show interface GigabitEthernet0/1"
        );
        assert_eq!(
            substitute_variables("show ip route vrf ${vrf} | i ${vrf}", &vars()),
            "show ip route vrf MGMT | i MGMT"
        );
    }

    #[test]
    fn test_unknown_placeholder_kept() {
        assert_eq!(substitute_variables("ping ${peer}", &vars()), "ping ${peer}");
        assert_eq!(substitute_variables("echo $HOME", &vars()), "echo $HOME");
    }

    #[test]
    fn test_skippable_lines() {
        assert!(is_skippable_line(""));
        assert!(is_skippable_line("   "));
        assert!(is_skippable_line("# save first"));
        assert!(is_skippable_line("  // note"));
        assert!(!is_skippable_line("show run"));
        assert!(!is_skippable_line("!"));
    }
}
