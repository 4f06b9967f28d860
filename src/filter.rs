use crate::pipeline::Mode;
use anyhow::{bail, Result};

/// Resolves which modes to run from the --mode / --skip lists
pub fn select_modes(modes: Option<Vec<String>>, skip: Option<Vec<String>>) -> Result<Vec<Mode>> {
    match (modes, skip) {
        (Some(_), Some(_)) => {
            bail!("Cannot use both --mode and --skip at the same time");
        }
        (Some(mode_list), None) => parse_modes(&mode_list),
        (None, Some(skip_list)) => {
            let skipped = parse_modes(&skip_list)?;
            Ok(Mode::ALL
                .iter()
                .copied()
                .filter(|m| !skipped.contains(m))
                .collect())
        }
        (None, None) => Ok(Mode::ALL.to_vec()),
    }
}

fn parse_modes(names: &[String]) -> Result<Vec<Mode>> {
    let mut modes = Vec::with_capacity(names.len());
    for name in names.iter().filter(|n| !n.trim().is_empty()) {
        modes.push(name.parse::<Mode>()?);
    }
    if modes.is_empty() {
        bail!("No modes given");
    }
    Ok(modes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Option<Vec<String>> {
        Some(list.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_default_is_every_mode() {
        assert_eq!(select_modes(None, None).unwrap(), Mode::ALL.to_vec());
    }

    #[test]
    fn test_skip_removes_modes() {
        let modes = select_modes(None, names(&["cobalt", "planet_exploit"])).unwrap();
        assert_eq!(modes.len(), Mode::ALL.len() - 2);
        assert!(!modes.contains(&Mode::Cobalt));
    }

    #[test]
    fn test_unknown_mode_and_both_lists_fail() {
        assert!(select_modes(names(&["lang", "nope"]), None).is_err());
        assert!(select_modes(names(&["lang"]), names(&["base"])).is_err());
    }
}
