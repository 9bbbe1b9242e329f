//! Extracts `--datadir`, `--network` and `--secrets-dir` out of the
//! validator binary's own argument list (the part of the command line
//! following `--`).
//!
//! The list is forwarded to the child verbatim; this parser's job is
//! extraction, not validation, so unrecognised flags are left untouched.
//! Grounded on the teacher's `common/clap_utils` role of pulling typed
//! values out of a flat argument list before the rest of the program uses
//! them.

use launcher_types::LauncherError;

const DATADIR_FLAG: &str = "--datadir";
const NETWORK_FLAG: &str = "--network";
const SECRETS_DIR_FLAG: &str = "--secrets-dir";

/// The three flags this launcher cares about, lifted out of the validator
/// binary's own argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFlags {
    pub datadir: String,
    pub network: String,
    pub secrets_dir: Option<String>,
}

/// Looks up `flag`'s value in `args`, accepting both `--flag value` and
/// `--flag=value` forms.
fn find_flag(args: &[String], flag: &str) -> Option<String> {
    let eq_prefix = format!("{}=", flag);

    for (i, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&eq_prefix) {
            return Some(value.to_string());
        }
        if arg == flag {
            return args.get(i + 1).cloned();
        }
    }

    None
}

/// Extracts `--datadir` and `--network` (required) and `--secrets-dir`
/// (optional) from `args`.
///
/// Returns `LauncherError::MissingFlag` if `--datadir` or `--network` are
/// absent or empty. Never mutates or validates the rest of `args`.
pub fn parse(args: &[String]) -> Result<ParsedFlags, LauncherError> {
    let datadir = find_flag(args, DATADIR_FLAG).filter(|v| !v.is_empty());
    let network = find_flag(args, NETWORK_FLAG).filter(|v| !v.is_empty());
    let secrets_dir = find_flag(args, SECRETS_DIR_FLAG).filter(|v| !v.is_empty());

    let datadir = datadir.ok_or_else(|| {
        LauncherError::MissingFlag(format!("{} is required", DATADIR_FLAG))
    })?;
    let network = network.ok_or_else(|| {
        LauncherError::MissingFlag(format!("{} is required", NETWORK_FLAG))
    })?;

    Ok(ParsedFlags {
        datadir,
        network,
        secrets_dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_space_and_equals_forms_identically() {
        let space_form = vec![
            "--datadir".to_string(),
            "/data".to_string(),
            "--network".to_string(),
            "mainnet".to_string(),
        ];
        let eq_form = vec![
            "--datadir=/data".to_string(),
            "--network=mainnet".to_string(),
        ];

        assert_eq!(parse(&space_form).unwrap(), parse(&eq_form).unwrap());
    }

    #[test]
    fn passes_through_unknown_flags() {
        let args = vec![
            "--datadir".to_string(),
            "/data".to_string(),
            "--network".to_string(),
            "mainnet".to_string(),
            "--graffiti".to_string(),
            "hello".to_string(),
        ];

        let parsed = parse(&args).unwrap();
        assert_eq!(parsed.datadir, "/data");
        assert_eq!(parsed.network, "mainnet");
        assert_eq!(parsed.secrets_dir, None);
    }

    #[test]
    fn missing_datadir_is_an_error() {
        let args = vec!["--network".to_string(), "mainnet".to_string()];
        let err = parse(&args).unwrap_err();
        assert!(matches!(err, LauncherError::MissingFlag(_)));
    }

    #[test]
    fn empty_value_counts_as_missing() {
        let args = vec![
            "--datadir=".to_string(),
            "--network".to_string(),
            "mainnet".to_string(),
        ];
        assert!(parse(&args).is_err());
    }

    #[test]
    fn secrets_dir_is_optional_but_extracted() {
        let args = vec![
            "--datadir".to_string(),
            "/data".to_string(),
            "--network".to_string(),
            "mainnet".to_string(),
            "--secrets-dir=/secrets".to_string(),
        ];
        let parsed = parse(&args).unwrap();
        assert_eq!(parsed.secrets_dir, Some("/secrets".to_string()));
    }
}
