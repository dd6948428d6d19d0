//! POSIX shell quoting.

/// Quotes one argument so `/bin/sh` reads it back as a single, unchanged word.
///
/// The argument is wrapped in single quotes; an embedded `'` closes the
/// quote, emits a double-quoted `'`, and reopens it.
#[must_use]
pub fn quote(arg: &str) -> String {
    if arg.is_empty() {
        return "''".to_string();
    }
    let escaped = arg.replace('\'', "'\"'\"'");
    format!("'{escaped}'")
}

/// Quotes every argument individually and joins them with spaces.
#[must_use]
pub fn quote_arguments<S: AsRef<str>>(args: &[S]) -> String {
    args.iter()
        .map(|a| quote(a.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Runs `sh -c` and returns the words the shell produced for `quoted`.
    fn shell_words(quoted: &str) -> Vec<String> {
        let script = format!("printf '%s\\0' {quoted}");
        let output = std::process::Command::new("/bin/sh")
            .arg("-c")
            .arg(script)
            .output()
            .expect("run sh");
        assert!(output.status.success());
        let mut words: Vec<String> = output
            .stdout
            .split(|b| *b == 0)
            .map(|w| String::from_utf8(w.to_vec()).expect("utf8"))
            .collect();
        let _ = words.pop();
        words
    }

    #[test]
    fn plain_word_is_single_quoted() {
        assert_eq!(quote("lxc-start"), "'lxc-start'");
    }

    #[test]
    fn empty_argument_survives() {
        assert_eq!(quote(""), "''");
    }

    #[test]
    fn embedded_single_quote_is_escaped() {
        assert_eq!(quote("it's"), "'it'\"'\"'s'");
    }

    #[test]
    fn shell_reads_back_every_argument_unchanged() {
        let args = vec![
            "lxc-start".to_string(),
            "/var/lib/my containers/c1/config.lxc".to_string(),
            "172.17.0.2/16".to_string(),
            "$HOME `id` $(rm -rf /) ; && | > <".to_string(),
            "it's \"quoted\"".to_string(),
            String::new(),
            "tab\there\nnewline".to_string(),
            "*?[a-z]".to_string(),
        ];
        assert_eq!(shell_words(&quote_arguments(&args)), args);
    }
}
